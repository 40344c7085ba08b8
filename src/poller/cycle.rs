//! One refresh tick: fan out the cycle's remote calls, wait for every one to
//! settle, publish a single aggregated snapshot.
//!
//! Failures are folded into the metric slot that produced them; they never
//! cancel or delay sibling calls, and nothing is retried inside a cycle —
//! the next scheduled tick is the retry mechanism.

use chrono::Utc;
use futures::future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::gateway::{Gateway, OptionOp};
use crate::status::{
    CycleSnapshot, MetricOutcome, MetricResult, StatusSink, StatusUpdate, TradeBatch,
};

/// The reference cycle: two idempotent reads plus the hedge push, issued
/// together every tick.
pub const DEFAULT_CYCLE_OPS: &[OptionOp] = &[
    OptionOp::TotalExposure,
    OptionOp::TotalPnl,
    OptionOp::PushHedgeTrades,
];

/// Executes one option-analytics refresh per invocation. Overlapping runs
/// are independent; snapshots publish in completion order and the sink
/// resolves ordering by assembly timestamp.
pub struct RefreshCycle {
    gateway: Arc<dyn Gateway>,
    sink: Arc<StatusSink>,
    ops: Vec<OptionOp>,
}

impl RefreshCycle {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<StatusSink>) -> Self {
        Self::with_ops(gateway, sink, DEFAULT_CYCLE_OPS.to_vec())
    }

    pub fn with_ops(gateway: Arc<dyn Gateway>, sink: Arc<StatusSink>, ops: Vec<OptionOp>) -> Self {
        Self { gateway, sink, ops }
    }

    pub async fn run_once(&self) {
        let metrics = future::join_all(self.ops.iter().map(|&op| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                let outcome = match gateway.call_option(op).await {
                    Ok(reading) => MetricOutcome::Ok {
                        value: reading.value,
                        reported_at: reading.reported_at,
                    },
                    Err(e) => {
                        warn!(op = op.label(), error = %e, "cycle call failed");
                        MetricOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                MetricResult {
                    name: op.label(),
                    outcome,
                }
            }
        }))
        .await;

        // Every call has settled; the snapshot is complete by construction.
        let snapshot = CycleSnapshot {
            assembled_at: Utc::now(),
            metrics,
        };

        if snapshot.all_failed() {
            warn!(assembled_at = %snapshot.assembled_at, "refresh cycle wholly errored");
        } else {
            debug!(assembled_at = %snapshot.assembled_at, "refresh cycle assembled");
        }

        self.sink.publish(StatusUpdate::Snapshot(snapshot)).await;
    }
}

/// Trade feed refresh: fetch the opaque rows and hand them to the sink.
pub struct TradeRefresh {
    gateway: Arc<dyn Gateway>,
    sink: Arc<StatusSink>,
}

impl TradeRefresh {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<StatusSink>) -> Self {
        Self { gateway, sink }
    }

    pub async fn run_once(&self) {
        match self.gateway.fetch_trades().await {
            Ok(rows) => {
                self.sink
                    .publish(StatusUpdate::Trades(TradeBatch {
                        fetched_at: Utc::now(),
                        rows,
                    }))
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "trade feed refresh failed");
                self.sink
                    .publish(StatusUpdate::Notice {
                        message: format!("Unable to fetch trades: {}", e),
                        at: Utc::now(),
                        is_error: true,
                    })
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HedgewatchError, Result};
    use crate::gateway::{ControlIntent, MetricReading};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;

    enum Behavior {
        Value(&'static str),
        Fail(&'static str),
    }

    struct FakeGateway {
        behaviors: HashMap<OptionOp, Behavior>,
        trades: std::result::Result<Vec<Value>, String>,
    }

    impl FakeGateway {
        fn new() -> Self {
            Self {
                behaviors: HashMap::new(),
                trades: Ok(Vec::new()),
            }
        }

        fn with(mut self, op: OptionOp, behavior: Behavior) -> Self {
            self.behaviors.insert(op, behavior);
            self
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn fetch_trades(&self) -> Result<Vec<Value>> {
            match &self.trades {
                Ok(rows) => Ok(rows.clone()),
                Err(reason) => Err(HedgewatchError::Transport(reason.clone())),
            }
        }

        async fn call_option(&self, op: OptionOp) -> Result<MetricReading> {
            match self.behaviors.get(&op) {
                Some(Behavior::Value(v)) => Ok(MetricReading {
                    value: v.to_string(),
                    reported_at: "2026-08-28T10:00:00".to_string(),
                }),
                Some(Behavior::Fail(reason)) => {
                    Err(HedgewatchError::Remote(reason.to_string()))
                }
                None => Err(HedgewatchError::Transport("no behavior".to_string())),
            }
        }

        async fn send_control(&self, _intent: ControlIntent) -> Result<String> {
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_partial_failure_publishes_complete_snapshot() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with(OptionOp::TotalExposure, Behavior::Value("1,250.00"))
                .with(OptionOp::TotalPnl, Behavior::Value("-42.10"))
                .with(OptionOp::PushHedgeTrades, Behavior::Fail("engine offline")),
        );
        let sink = Arc::new(StatusSink::new(10));
        let cycle = RefreshCycle::new(gateway, Arc::clone(&sink));

        cycle.run_once().await;

        let record = sink.current().await;
        assert!(record.is_error, "one failed metric flags the record");
        assert!(record.message.contains("Total Exposure = 1,250.00"));
        assert!(record.message.contains("Total PnL = -42.10"));
        assert!(record.message.contains("Hedge push failed: Remote error: engine offline"));
        // Exactly one snapshot was published.
        assert_eq!(sink.log_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_wholly_errored_cycle_still_publishes() {
        let gateway = Arc::new(
            FakeGateway::new()
                .with(OptionOp::TotalExposure, Behavior::Fail("down"))
                .with(OptionOp::TotalPnl, Behavior::Fail("down"))
                .with(OptionOp::PushHedgeTrades, Behavior::Fail("down")),
        );
        let sink = Arc::new(StatusSink::new(10));
        let cycle = RefreshCycle::new(gateway, Arc::clone(&sink));

        cycle.run_once().await;

        let record = sink.current().await;
        assert!(record.is_error);
        assert_eq!(sink.log_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_trade_refresh_publishes_batch() {
        let mut gateway = FakeGateway::new();
        gateway.trades = Ok(vec![serde_json::json!({"symbol": "SPX"})]);
        let sink = Arc::new(StatusSink::new(10));
        let refresh = TradeRefresh::new(Arc::new(gateway), Arc::clone(&sink));

        refresh.run_once().await;

        assert_eq!(sink.current().await.message, "Fetched 1 trades");
        assert_eq!(sink.latest_trades().await.unwrap().rows.len(), 1);
    }

    #[tokio::test]
    async fn test_trade_refresh_failure_is_reported() {
        let mut gateway = FakeGateway::new();
        gateway.trades = Err("connection refused".to_string());
        let sink = Arc::new(StatusSink::new(10));
        let refresh = TradeRefresh::new(Arc::new(gateway), Arc::clone(&sink));

        refresh.run_once().await;

        let record = sink.current().await;
        assert!(record.is_error);
        assert!(record.message.contains("Unable to fetch trades"));
    }
}
