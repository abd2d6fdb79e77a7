use std::env;
use std::time::Duration;

use crate::contracts::ContractConfig;

pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub contract: ContractConfig,
    pub watch_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let watch_interval_secs = match env::var("WATCH_INTERVAL_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("WATCH_INTERVAL_SECS"))?,
            Err(_) => DEFAULT_WATCH_INTERVAL_SECS,
        };

        Ok(Config {
            contract: ContractConfig::from_env()?,
            watch_interval: Duration::from_secs(watch_interval_secs),
        })
    }

    /// Whether a signing key is configured
    pub fn can_sign(&self) -> bool {
        self.contract.private_key.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for: {0}")]
    Invalid(&'static str),
}
