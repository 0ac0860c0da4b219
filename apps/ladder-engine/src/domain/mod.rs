//! Domain layer: ladder state and the value objects it is built from.
//!
//! Nothing in here performs I/O. The application layer drives the domain
//! through the ports it defines; infrastructure supplies the adapters.

pub mod ladder;
pub mod shared;
