//! Advisor Port (Driven Port)
//!
//! Free-text question in, free-text answer out.

use async_trait::async_trait;

/// Advisor errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    /// The advisory backend could not be reached or refused the request.
    #[error("{0}")]
    Unavailable(String),
}

/// Port for the advisory chat function.
#[async_trait]
pub trait AdvisorPort: Send + Sync {
    /// Answer a free-text message.
    async fn ask(&self, message: &str) -> Result<String, AdvisorError>;
}
