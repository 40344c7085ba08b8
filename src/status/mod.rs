//! Observable state: status record, aggregated snapshots, and the sink that
//! reconciles them.

pub mod sink;

pub use sink::{LogEntry, StatusSink};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::gateway::ControlIntent;

/// The externally visible state. Owned by the sink; mutated only through
/// [`StatusSink::publish`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusRecord {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

impl StatusRecord {
    /// Defined initial state, timestamped at the epoch so any real update
    /// wins last-writer-wins.
    pub fn not_started() -> Self {
        Self {
            message: "Not yet started".to_string(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            is_error: false,
        }
    }
}

/// Outcome of one remote call within a cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MetricOutcome {
    Ok {
        value: String,
        /// Backend-reported timestamp, passed through verbatim.
        reported_at: String,
    },
    Failed {
        reason: String,
    },
}

impl MetricOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One named metric slot of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricResult {
    pub name: &'static str,
    pub outcome: MetricOutcome,
}

impl MetricResult {
    fn render(&self) -> String {
        match &self.outcome {
            MetricOutcome::Ok { value, .. } => format!("{} = {}", self.name, value),
            MetricOutcome::Failed { reason } => format!("{} failed: {}", self.name, reason),
        }
    }
}

/// All-or-nothing result set of one refresh cycle. Only assembled once every
/// call issued in the cycle has settled.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSnapshot {
    pub assembled_at: DateTime<Utc>,
    pub metrics: Vec<MetricResult>,
}

impl CycleSnapshot {
    pub fn all_failed(&self) -> bool {
        !self.metrics.is_empty() && self.metrics.iter().all(|m| m.outcome.is_failed())
    }

    pub fn any_failed(&self) -> bool {
        self.metrics.iter().any(|m| m.outcome.is_failed())
    }

    fn summary(&self) -> String {
        self.metrics
            .iter()
            .map(MetricResult::render)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One trade-feed refresh. Rows are opaque and handed to the display layer
/// verbatim.
#[derive(Debug, Clone)]
pub struct TradeBatch {
    pub fetched_at: DateTime<Utc>,
    pub rows: Vec<Value>,
}

/// Settled result of one control command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub intent: ControlIntent,
    pub issued_at: DateTime<Utc>,
    pub outcome: std::result::Result<String, String>,
}

/// One update accepted by the sink. Each variant carries its own assembly or
/// issue timestamp; the sink resolves ordering by that timestamp, not by
/// arrival order.
#[derive(Debug, Clone)]
pub enum StatusUpdate {
    Snapshot(CycleSnapshot),
    Trades(TradeBatch),
    Command(CommandOutcome),
    Notice {
        message: String,
        at: DateTime<Utc>,
        is_error: bool,
    },
}

impl StatusUpdate {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Snapshot(s) => s.assembled_at,
            Self::Trades(t) => t.fetched_at,
            Self::Command(c) => c.issued_at,
            Self::Notice { at, .. } => *at,
        }
    }

    pub(crate) fn to_record(&self) -> StatusRecord {
        match self {
            Self::Snapshot(s) => StatusRecord {
                message: s.summary(),
                timestamp: s.assembled_at,
                is_error: s.any_failed(),
            },
            Self::Trades(t) => StatusRecord {
                message: format!("Fetched {} trades", t.rows.len()),
                timestamp: t.fetched_at,
                is_error: false,
            },
            Self::Command(c) => match &c.outcome {
                Ok(message) => StatusRecord {
                    message: message.clone(),
                    timestamp: c.issued_at,
                    is_error: false,
                },
                Err(reason) => StatusRecord {
                    message: format!("Error: {}", reason),
                    timestamp: c.issued_at,
                    is_error: true,
                },
            },
            Self::Notice {
                message,
                at,
                is_error,
            } => StatusRecord {
                message: message.clone(),
                timestamp: *at,
                is_error: *is_error,
            },
        }
    }
}
