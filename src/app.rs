//! Application facade wiring gateway, scheduler, dispatcher, and sink.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::control::CommandDispatcher;
use crate::error::Result;
use crate::gateway::{ControlIntent, Gateway, HttpGateway, OptionOp};
use crate::poller::{PollHandle, PollScheduler, RefreshCycle, TradeRefresh};
use crate::status::{LogEntry, StatusRecord, StatusSink, StatusUpdate, TradeBatch};
use chrono::Utc;
use tokio::sync::broadcast;

pub struct HedgeWatch {
    config: AppConfig,
    gateway: Arc<dyn Gateway>,
    scheduler: PollScheduler,
    dispatcher: CommandDispatcher,
    sink: Arc<StatusSink>,
}

impl HedgeWatch {
    /// Wire the facade around an arbitrary gateway (tests inject fakes here).
    pub fn new(config: AppConfig, gateway: Arc<dyn Gateway>) -> Self {
        let sink = Arc::new(StatusSink::new(config.status.log_capacity));
        let dispatcher = CommandDispatcher::new(Arc::clone(&gateway), Arc::clone(&sink));
        Self {
            config,
            gateway,
            scheduler: PollScheduler::new(),
            dispatcher,
            sink,
        }
    }

    /// Wire the facade around the real HTTP gateway.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let gateway = HttpGateway::new(
            &config.gateway.base_url,
            Duration::from_secs(config.gateway.request_timeout_secs),
        )?;
        Ok(Self::new(config, Arc::new(gateway)))
    }

    /// Start (or replace) the option refresh poller at the given cadence.
    pub fn start_polling(&self, cadence_secs: u64) -> Result<()> {
        let cycle = Arc::new(RefreshCycle::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.sink),
        ));
        self.scheduler.start(
            PollHandle::OptionCycle,
            cadence_secs,
            Duration::ZERO,
            move || {
                let cycle = Arc::clone(&cycle);
                // Fire-and-forget: the timer never waits for the cycle, so a
                // slow backend can overlap two in-flight cycles.
                tokio::spawn(async move { cycle.run_once().await });
            },
        )
    }

    pub fn stop_polling(&self) {
        self.scheduler.stop(PollHandle::OptionCycle);
    }

    /// Start (or replace) the trade feed poller. The first fetch waits for
    /// the configured warm-up delay.
    pub fn start_trade_feed(&self, cadence_secs: u64) -> Result<()> {
        let refresh = Arc::new(TradeRefresh::new(
            Arc::clone(&self.gateway),
            Arc::clone(&self.sink),
        ));
        self.scheduler.start(
            PollHandle::TradeFeed,
            cadence_secs,
            Duration::from_secs(self.config.poll.trades_initial_delay_secs),
            move || {
                let refresh = Arc::clone(&refresh);
                tokio::spawn(async move { refresh.run_once().await });
            },
        )
    }

    pub fn stop_trade_feed(&self) {
        self.scheduler.stop(PollHandle::TradeFeed);
    }

    /// Issue one control command; rejects overlapping intents.
    pub async fn dispatch_control(&self, intent: ControlIntent) -> Result<()> {
        self.dispatcher.dispatch(intent).await
    }

    /// One-shot: (re)initialize the backend option state.
    pub async fn init_options(&self) {
        self.query_metric(OptionOp::Init).await;
    }

    /// One-shot invocation of a single option operation. The outcome is
    /// folded into the sink like any other update, never returned as an
    /// error.
    pub async fn query_metric(&self, op: OptionOp) {
        let update = match self.gateway.call_option(op).await {
            Ok(reading) => StatusUpdate::Notice {
                message: format!("{} = {}", op.label(), reading.value),
                at: Utc::now(),
                is_error: false,
            },
            Err(e) => StatusUpdate::Notice {
                message: format!("{} failed: {}", op.label(), e),
                at: Utc::now(),
                is_error: true,
            },
        };
        self.sink.publish(update).await;
    }

    pub async fn status(&self) -> StatusRecord {
        self.sink.current().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusRecord> {
        self.sink.subscribe()
    }

    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.sink.log_entries().await
    }

    pub async fn latest_trades(&self) -> Option<TradeBatch> {
        self.sink.latest_trades().await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stop all timers. In-flight cycles complete and publish; only future
    /// ticks are prevented.
    pub fn shutdown(&self) {
        info!("shutting down pollers");
        self.scheduler.stop_all();
    }
}
