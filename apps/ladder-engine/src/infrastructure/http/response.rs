//! HTTP response DTOs.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Completed reconciliation ticks.
    pub ticks: u64,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
    /// Offending field, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Advisor reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorResponse {
    /// Free-text answer.
    pub reply: String,
}
