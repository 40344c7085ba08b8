//! Last-writer-wins projection of snapshots and command outcomes.
//!
//! The status record is the only shared mutable state in the system and is
//! mutated solely through [`StatusSink::publish`]. Updates are resolved by
//! their own assembly/issue timestamp so a late-finishing older cycle can
//! never overwrite a newer one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{StatusRecord, StatusUpdate, TradeBatch};

const BROADCAST_CAPACITY: usize = 64;

/// One line of the append-only log view.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Arrival time; the log records what happened in the order it was seen.
    pub at: DateTime<Utc>,
    pub message: String,
    pub is_error: bool,
}

struct SinkState {
    current: StatusRecord,
    log: VecDeque<LogEntry>,
    last_trades: Option<TradeBatch>,
}

pub struct StatusSink {
    state: RwLock<SinkState>,
    tx: broadcast::Sender<StatusRecord>,
    log_capacity: usize,
}

impl StatusSink {
    pub fn new(log_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            state: RwLock::new(SinkState {
                current: StatusRecord::not_started(),
                log: VecDeque::new(),
                last_trades: None,
            }),
            tx,
            log_capacity,
        }
    }

    /// Single update entry point. Appends to the log unconditionally; the
    /// record itself only moves forward in logical time.
    pub async fn publish(&self, update: StatusUpdate) {
        let record = update.to_record();

        let mut state = self.state.write().await;

        state.log.push_back(LogEntry {
            at: Utc::now(),
            message: record.message.clone(),
            is_error: record.is_error,
        });
        while state.log.len() > self.log_capacity {
            state.log.pop_front();
        }

        if let StatusUpdate::Trades(batch) = &update {
            let newer = state
                .last_trades
                .as_ref()
                .map(|prev| batch.fetched_at >= prev.fetched_at)
                .unwrap_or(true);
            if newer {
                state.last_trades = Some(batch.clone());
            }
        }

        if record.timestamp >= state.current.timestamp {
            state.current = record.clone();
            drop(state);
            // Subscribers are only woken when the record actually changed.
            let _ = self.tx.send(record);
        } else {
            debug!(
                update_ts = %record.timestamp,
                current_ts = %state.current.timestamp,
                "stale update lost last-writer-wins, log entry kept"
            );
        }
    }

    /// Latest status record; always available.
    pub async fn current(&self) -> StatusRecord {
        self.state.read().await.current.clone()
    }

    /// Push notification on every status record change.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusRecord> {
        self.tx.subscribe()
    }

    /// The most recent trade batch, for display binding.
    pub async fn latest_trades(&self) -> Option<TradeBatch> {
        self.state.read().await.last_trades.clone()
    }

    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.state.read().await.log.iter().cloned().collect()
    }
}
