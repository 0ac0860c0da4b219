//! Reconciliation engine configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::services::LadderDriverConfig;
use crate::application::use_cases::LadderEngineConfig;

/// Engine and driver tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between reconciliation ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Quantity of every entry and level order.
    #[serde(default = "default_order_quantity")]
    pub order_quantity: Decimal,
    /// Pause after an entry market buy before reading its fill.
    #[serde(default = "default_entry_fill_wait_ms")]
    pub entry_fill_wait_ms: u64,
    /// Deadline for every broker call.
    #[serde(default = "default_broker_call_timeout_secs")]
    pub broker_call_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            order_quantity: default_order_quantity(),
            entry_fill_wait_ms: default_entry_fill_wait_ms(),
            broker_call_timeout_secs: default_broker_call_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Engine tuning derived from this section.
    #[must_use]
    pub const fn ladder_engine(&self) -> LadderEngineConfig {
        LadderEngineConfig {
            order_quantity: self.order_quantity,
            entry_fill_wait: Duration::from_millis(self.entry_fill_wait_ms),
            broker_call_timeout: Duration::from_secs(self.broker_call_timeout_secs),
        }
    }

    /// Driver tuning derived from this section.
    #[must_use]
    pub const fn driver(&self) -> LadderDriverConfig {
        LadderDriverConfig {
            interval: Duration::from_secs(self.interval_secs),
        }
    }
}

const fn default_interval_secs() -> u64 {
    5
}

const fn default_order_quantity() -> Decimal {
    Decimal::ONE
}

const fn default_entry_fill_wait_ms() -> u64 {
    2000
}

const fn default_broker_call_timeout_secs() -> u64 {
    10
}
