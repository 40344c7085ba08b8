pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod status;

pub use app::HedgeWatch;
pub use config::AppConfig;
pub use control::CommandDispatcher;
pub use error::{HedgewatchError, Result};
pub use gateway::{ControlIntent, Gateway, HttpGateway, MetricReading, OptionOp};
pub use poller::{PollHandle, PollScheduler, RefreshCycle, TradeRefresh, DEFAULT_CYCLE_OPS};
pub use status::{
    CommandOutcome, CycleSnapshot, LogEntry, MetricOutcome, MetricResult, StatusRecord,
    StatusSink, StatusUpdate, TradeBatch,
};
