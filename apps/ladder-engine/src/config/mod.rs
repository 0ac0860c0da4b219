//! Configuration module for the ladder engine.
//!
//! YAML loading with `${VAR}` / `${VAR:-default}` environment interpolation
//! and validation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ladder_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("deploy/config.yaml"))?;
//!
//! println!("tick every {}s", config.engine.interval_secs);
//! ```

mod brokers;
mod engine;
mod observability;
mod persistence;
mod server;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use brokers::{AlpacaSection, BrokerMode, BrokersConfig, RetrySection, VALID_ENVIRONMENTS};
pub use engine::EngineConfig;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use persistence::PersistenceConfig;
pub use server::ServerConfig;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Accepted values for `observability.logging.format`.
const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Engine and driver tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Broker configuration.
    #[serde(default)]
    pub broker: BrokersConfig,
    /// Instrument book persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(value) if !value.is_empty() => value,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let engine = &config.engine;
    if engine.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.interval_secs must be positive".to_string(),
        ));
    }
    if engine.order_quantity <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "engine.order_quantity must be positive".to_string(),
        ));
    }
    if engine.broker_call_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "engine.broker_call_timeout_secs must be positive".to_string(),
        ));
    }

    let alpaca = &config.broker.alpaca;
    alpaca.parsed_environment()?;
    if config.broker.mode == BrokerMode::Alpaca
        && (alpaca.api_key.trim().is_empty() || alpaca.api_secret.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "broker.alpaca.api_key and api_secret are required when broker.mode is alpaca"
                .to_string(),
        ));
    }
    if alpaca.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "broker.alpaca.retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if !alpaca.retry.multiplier.is_finite() || alpaca.retry.multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "broker.alpaca.retry.multiplier must be at least 1.0".to_string(),
        ));
    }

    if config.persistence.path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "persistence.path must not be empty".to_string(),
        ));
    }

    let format = config.observability.logging.format.to_ascii_lowercase();
    if !VALID_LOG_FORMATS.contains(&format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {VALID_LOG_FORMATS:?}"
        )));
    }

    Ok(())
}
