use thiserror::Error;

/// Main error type for the watch console
#[derive(Error, Debug)]
pub enum HedgewatchError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network-level failure: connect error, timeout, non-2xx status,
    // or an unreadable response body
    #[error("Transport failure: {0}")]
    Transport(String),

    // The gateway answered 200 but carried an explicit error payload
    #[error("Remote error: {0}")]
    Remote(String),

    // Scheduler rejection, returned synchronously to the caller
    #[error("Poll cadence must be at least 1 second, got {0}")]
    InvalidCadence(u64),

    // Dispatcher rejection, returned synchronously to the caller
    #[error("A control command is already in flight")]
    CommandInFlight,

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for HedgewatchError
pub type Result<T> = std::result::Result<T, HedgewatchError>;
