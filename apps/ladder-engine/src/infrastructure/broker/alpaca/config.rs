//! Alpaca adapter configuration.

use std::time::Duration;

/// Environment for Alpaca API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpacaEnvironment {
    /// Paper trading (simulated).
    Paper,
    /// Live trading (real money).
    Live,
}

impl AlpacaEnvironment {
    /// Default base URL for the trading API.
    #[must_use]
    pub const fn trading_base_url(&self) -> &'static str {
        match self {
            Self::Paper => "https://paper-api.alpaca.markets",
            Self::Live => "https://api.alpaca.markets",
        }
    }

    /// Default base URL for the market data API.
    #[must_use]
    pub const fn data_base_url(&self) -> &'static str {
        "https://data.alpaca.markets"
    }

    /// Check if this is live trading.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl std::fmt::Display for AlpacaEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "PAPER"),
            Self::Live => write!(f, "LIVE"),
        }
    }
}

/// Configuration for the Alpaca broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// API key.
    pub api_key: String,
    /// API secret.
    pub api_secret: String,
    /// Trading environment.
    pub environment: AlpacaEnvironment,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
    /// Trading API base URL.
    pub trading_base_url: String,
    /// Market data API base URL.
    pub data_base_url: String,
}

impl AlpacaConfig {
    /// Create a configuration pointing at the environment's public endpoints.
    #[must_use]
    pub fn new(api_key: String, api_secret: String, environment: AlpacaEnvironment) -> Self {
        Self {
            api_key,
            api_secret,
            environment,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            trading_base_url: environment.trading_base_url().to_string(),
            data_base_url: environment.data_base_url().to_string(),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Point both APIs somewhere else, e.g. a local mock server.
    #[must_use]
    pub fn with_base_urls(mut self, trading: impl Into<String>, data: impl Into<String>) -> Self {
        self.trading_base_url = trading.into();
        self.data_base_url = data.into();
        self
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper() -> AlpacaConfig {
        AlpacaConfig::new("key".to_string(), "secret".to_string(), AlpacaEnvironment::Paper)
    }

    #[test]
    fn environment_urls() {
        assert!(AlpacaEnvironment::Paper.trading_base_url().contains("paper"));
        assert!(!AlpacaEnvironment::Live.trading_base_url().contains("paper"));
        assert!(AlpacaEnvironment::Live.is_live());
    }

    #[test]
    fn new_config_uses_environment_urls() {
        let config = paper();
        assert_eq!(config.trading_base_url, "https://paper-api.alpaca.markets");
        assert_eq!(config.data_base_url, "https://data.alpaca.markets");
    }

    #[test]
    fn base_urls_can_be_overridden() {
        let config = paper().with_base_urls("http://127.0.0.1:9000", "http://127.0.0.1:9001");
        assert_eq!(config.trading_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.data_base_url, "http://127.0.0.1:9001");
    }

    #[test]
    fn builder_overrides_timeout_and_retry() {
        let config = paper()
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            });
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn environment_display() {
        assert_eq!(AlpacaEnvironment::Paper.to_string(), "PAPER");
        assert_eq!(AlpacaEnvironment::Live.to_string(), "LIVE");
    }
}
