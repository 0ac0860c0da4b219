//! Advisor adapters.

use async_trait::async_trait;

use crate::application::ports::{AdvisorError, AdvisorPort};

/// Canned advisor that echoes the question back.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoAdvisor;

impl EchoAdvisor {
    /// Create a new echo advisor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdvisorPort for EchoAdvisor {
    async fn ask(&self, message: &str) -> Result<String, AdvisorError> {
        Ok(format!("Mock response to: {message}"))
    }
}
