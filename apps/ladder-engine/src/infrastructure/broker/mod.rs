//! Broker adapters implementing `BrokerGateway`.

pub mod alpaca;
pub mod paper;

pub use alpaca::{AlpacaBrokerAdapter, AlpacaConfig, AlpacaEnvironment, AlpacaError, RetryConfig};
pub use paper::PaperBroker;
