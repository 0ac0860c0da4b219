//! Application Services
//!
//! Long-running background tasks that drive the use cases.

mod ladder_driver;

pub use ladder_driver::{LadderDriver, LadderDriverConfig};
