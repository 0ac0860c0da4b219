//! Alpaca Markets Broker Adapter
//!
//! `BrokerGateway` over the Alpaca REST API:
//! - latest trade from the market data API
//! - positions, order history and order entry from the trading API
//! - retry with exponential backoff on transient failures
//! - PAPER/LIVE environment selection

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::AlpacaBrokerAdapter;
pub use config::{AlpacaConfig, AlpacaEnvironment, RetryConfig};
pub use error::AlpacaError;
