//! Remote gateway boundary: trade feed, option analytics, toolbar control.
//!
//! The backend is treated as an external collaborator behind the [`Gateway`]
//! trait so the orchestration core can be driven against a fake in tests.

pub mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// One named option-analytics operation exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionOp {
    Init,
    TotalPnl,
    TotalExposure,
    OptExposure,
    HedgePnl,
    OptionPnl,
    PushHedgeTrades,
}

impl OptionOp {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Init => "/option/init",
            Self::TotalPnl => "/option/get_total_pnl_tos",
            Self::TotalExposure => "/option/get_total_exposure",
            Self::OptExposure => "/option/get_opt_exposure",
            Self::HedgePnl => "/option/get_hedge_pnl_tos",
            Self::OptionPnl => "/option/get_option_pnl_tos",
            Self::PushHedgeTrades => "/option/push_hedge_trades",
        }
    }

    /// `push_hedge_trades` is the only side-effecting operation.
    pub fn is_post(&self) -> bool {
        matches!(self, Self::PushHedgeTrades)
    }

    /// Display name used in status lines and metric slots.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Init => "Option init",
            Self::TotalPnl => "Total PnL",
            Self::TotalExposure => "Total Exposure",
            Self::OptExposure => "Option Exposure",
            Self::HedgePnl => "Hedge PnL",
            Self::OptionPnl => "Option PnL",
            Self::PushHedgeTrades => "Hedge push",
        }
    }
}

/// A discrete control instruction aimed at the remote trading process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlIntent {
    Play,
    Pause,
    Stop,
}

impl ControlIntent {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Play => "/toolbar/play",
            Self::Pause => "/toolbar/pause",
            Self::Stop => "/toolbar/stop",
        }
    }

    /// Status line shown while the command is outstanding.
    pub fn pending_message(&self) -> &'static str {
        match self {
            Self::Play => "Starting system...",
            Self::Pause => "Pausing system...",
            Self::Stop => "Stopping system...",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }
}

impl std::fmt::Display for ControlIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Successful option-analytics payload: the backend formats values
/// server-side, so both fields are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricReading {
    pub value: String,
    /// Backend-reported ISO timestamp for the computation.
    pub reported_at: String,
}

/// Request/response boundary to the remote backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch the trade feed. Rows are opaque to the core and handed to the
    /// display layer verbatim.
    async fn fetch_trades(&self) -> Result<Vec<Value>>;

    /// Invoke one option-analytics operation.
    async fn call_option(&self, op: OptionOp) -> Result<MetricReading>;

    /// Issue one toolbar control command, returning the backend message.
    async fn send_control(&self, intent: ControlIntent) -> Result<String>;
}
