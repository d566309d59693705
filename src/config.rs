use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::risk::{RiskConfig, RiskConfigError};

const ENV_PREFIX: &str = "CLAWBOT";
const DEFAULT_CONFIG_FILE: &str = "clawbot";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid configuration: {0}")]
    Risk(#[from] RiskConfigError),
}

/// Market/execution endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub market: String,
    pub requests_per_minute: u32,
    /// Fill orders with the simulated executor instead of the HTTP endpoint
    pub paper_trading: bool,
    pub paper_seed: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.polymarket.com".to_string(),
            api_key: String::new(),
            market: "btc-price".to_string(),
            requests_per_minute: 60,
            paper_trading: true,
            paper_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub initial_balance: f64,
    pub tick_interval_secs: u64,
    pub trade_interval_secs: u64,
    pub window_capacity: usize,
    pub velocity_threshold: f64,
    pub max_consecutive_losses: u32,
    pub snapshot_every_trades: usize,
    pub request_timeout_secs: u64,
    pub status_interval_secs: u64,
    /// Period of the CSV dump of recent log lines
    pub log_export_interval_secs: u64,
    pub risk: RiskConfig,
    pub provider: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10000.0,
            tick_interval_secs: 15,
            trade_interval_secs: 300,
            window_capacity: 40,
            velocity_threshold: 0.1,
            max_consecutive_losses: 3,
            snapshot_every_trades: 10,
            request_timeout_secs: 10,
            status_interval_secs: 60,
            log_export_interval_secs: 300,
            risk: RiskConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `clawbot.toml` if present, then `CLAWBOT_*` environment variables
    ///
    /// Nested keys use a double underscore, e.g. `CLAWBOT_RISK__MAX_DRAWDOWN_PCT`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(file: &Path) -> Result<Self, ConfigError> {
        let file_name = file.to_string_lossy();
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(&file_name).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "initial_balance must be positive, got {}",
                self.initial_balance
            )));
        }
        if self.tick_interval_secs == 0 || self.trade_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_secs and trade_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.window_capacity < 2 {
            return Err(ConfigError::Invalid(format!(
                "window_capacity must be at least 2, got {}",
                self.window_capacity
            )));
        }
        if !self.velocity_threshold.is_finite() || self.velocity_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "velocity_threshold must be non-negative, got {}",
                self.velocity_threshold
            )));
        }
        if self.max_consecutive_losses == 0 || self.snapshot_every_trades == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_losses and snapshot_every_trades must be non-zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be non-zero".to_string(),
            ));
        }
        self.risk.validate()?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }

    pub fn log_export_interval(&self) -> Duration {
        Duration::from_secs(self.log_export_interval_secs.max(1))
    }
}
