//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `broker/`: Alpaca REST adapter and an in-process paper broker
//!   - `persistence/`: JSON file and in-memory instrument stores
//!   - `advisor/`: advisory chat adapter
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: JSON API controllers

pub mod advisor;
pub mod broker;
pub mod http;
pub mod persistence;
