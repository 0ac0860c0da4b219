//! Application layer: ports, use cases and background services.

pub mod dto;
pub mod ports;
pub mod services;
pub mod use_cases;
