//! Periodic refresh machinery: timer ownership and per-tick cycles.

pub mod cycle;
pub mod scheduler;

pub use cycle::{RefreshCycle, TradeRefresh, DEFAULT_CYCLE_OPS};
pub use scheduler::{PollHandle, PollScheduler};
