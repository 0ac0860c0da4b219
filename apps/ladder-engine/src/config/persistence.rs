//! Instrument book persistence configuration.

use serde::{Deserialize, Serialize};

/// Where the instrument book is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON document.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "instruments.json".to_string()
}
