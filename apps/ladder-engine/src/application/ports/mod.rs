//! Application Ports (Driven)
//!
//! Interfaces the engine uses to reach the outside world. Infrastructure
//! provides the adapters.

mod advisor_port;
mod broker_gateway;
mod instrument_store;

pub use advisor_port::{AdvisorError, AdvisorPort};
pub use broker_gateway::{BrokerError, BrokerGateway, OrderAck, OrderType, SubmitOrderRequest, TimeInForce};
pub use instrument_store::{InstrumentBook, InstrumentStore, StoreError, load_or_empty};
