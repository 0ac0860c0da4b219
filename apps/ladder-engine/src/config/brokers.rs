//! Broker configuration for order routing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::infrastructure::broker::{AlpacaConfig, AlpacaEnvironment, RetryConfig};

/// Environments accepted for `broker.alpaca.environment`.
pub const VALID_ENVIRONMENTS: [&str; 2] = ["PAPER", "LIVE"];

/// Which broker implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerMode {
    /// In-process simulated broker.
    #[default]
    Paper,
    /// Alpaca REST API.
    Alpaca,
}

impl std::fmt::Display for BrokerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Alpaca => write!(f, "alpaca"),
        }
    }
}

/// Broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokersConfig {
    /// Selected implementation.
    #[serde(default)]
    pub mode: BrokerMode,
    /// Alpaca broker configuration.
    #[serde(default)]
    pub alpaca: AlpacaSection,
}

/// Alpaca broker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaSection {
    /// "PAPER" or "LIVE".
    #[serde(default = "default_environment")]
    pub environment: String,
    /// API key.
    #[serde(default)]
    pub api_key: String,
    /// API secret.
    #[serde(default)]
    pub api_secret: String,
    /// Trading API base URL override.
    #[serde(default)]
    pub trading_base_url: Option<String>,
    /// Market data API base URL override.
    #[serde(default)]
    pub data_base_url: Option<String>,
    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for AlpacaSection {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api_key: String::new(),
            api_secret: String::new(),
            trading_base_url: None,
            data_base_url: None,
            timeout_secs: default_timeout_secs(),
            retry: RetrySection::default(),
        }
    }
}

impl AlpacaSection {
    /// Parsed trading environment.
    pub fn parsed_environment(&self) -> Result<AlpacaEnvironment, ConfigError> {
        match self.environment.trim().to_ascii_uppercase().as_str() {
            "PAPER" => Ok(AlpacaEnvironment::Paper),
            "LIVE" => Ok(AlpacaEnvironment::Live),
            _ => Err(ConfigError::ValidationError(format!(
                "broker.alpaca.environment must be one of: {VALID_ENVIRONMENTS:?}"
            ))),
        }
    }

    /// Adapter configuration built from this section.
    pub fn adapter_config(&self) -> Result<AlpacaConfig, ConfigError> {
        let environment = self.parsed_environment()?;
        let mut config =
            AlpacaConfig::new(self.api_key.clone(), self.api_secret.clone(), environment)
                .with_timeout(Duration::from_secs(self.timeout_secs))
                .with_retry(self.retry.retry_config());
        if let Some(url) = &self.trading_base_url {
            config.trading_base_url.clone_from(url);
        }
        if let Some(url) = &self.data_base_url {
            config.data_base_url.clone_from(url);
        }
        Ok(config)
    }
}

/// Retry policy for broker HTTP calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    /// Maximum number of attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetrySection {
    /// Adapter retry policy.
    #[must_use]
    pub const fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

fn default_environment() -> String {
    "PAPER".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_multiplier() -> f64 {
    2.0
}
