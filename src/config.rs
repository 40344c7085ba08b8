use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the analytics backend (e.g., "http://127.0.0.1:5000")
    pub base_url: String,
    /// Per-call timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Cadence of the option refresh cycle in seconds
    #[serde(default = "default_cadence")]
    pub option_cadence_secs: u64,
    /// Cadence of the trade feed refresh in seconds
    #[serde(default = "default_cadence")]
    pub trades_cadence_secs: u64,
    /// Delay before the trade feed starts, letting the backend warm up
    #[serde(default = "default_trades_initial_delay")]
    pub trades_initial_delay_secs: u64,
}

fn default_cadence() -> u64 {
    5
}

fn default_trades_initial_delay() -> u64 {
    3
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            option_cadence_secs: 5,
            trades_cadence_secs: 5,
            trades_initial_delay_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Maximum entries retained in the status log (ring buffer)
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

fn default_log_capacity() -> usize {
    500
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { log_capacity: 500 }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("gateway.base_url", "http://127.0.0.1:5000")?
            .set_default("gateway.request_timeout_secs", 30)?
            .set_default("poll.option_cadence_secs", 5)?
            .set_default("poll.trades_cadence_secs", 5)?
            .set_default("poll.trades_initial_delay_secs", 3)?
            .set_default("status.log_capacity", 500)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HEDGEWATCH_ENV")
                        .unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HEDGEWATCH_GATEWAY__BASE_URL, etc.)
            .add_source(
                Environment::with_prefix("HEDGEWATCH")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.gateway.base_url.trim().is_empty() {
            errors.push("gateway.base_url must not be empty".to_string());
        }

        if self.gateway.request_timeout_secs == 0 {
            errors.push("gateway.request_timeout_secs must be at least 1".to_string());
        }

        if self.poll.option_cadence_secs == 0 {
            errors.push("poll.option_cadence_secs must be at least 1".to_string());
        }

        if self.poll.trades_cadence_secs == 0 {
            errors.push("poll.trades_cadence_secs must be at least 1".to_string());
        }

        if self.status.log_capacity == 0 {
            errors.push("status.log_capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
