//! Ask Advisor Use Case

use std::sync::Arc;

use crate::application::ports::AdvisorPort;

/// Use case for the advisory chat. Never fails; problems come back as text.
pub struct AskAdvisorUseCase<A>
where
    A: AdvisorPort,
{
    advisor: Arc<A>,
}

impl<A> AskAdvisorUseCase<A>
where
    A: AdvisorPort,
{
    /// Create a new AskAdvisorUseCase.
    pub const fn new(advisor: Arc<A>) -> Self {
        Self { advisor }
    }

    /// Ask the advisor a question.
    pub async fn execute(&self, message: &str) -> String {
        let message = message.trim();
        if message.is_empty() {
            return "Please enter a message.".to_string();
        }
        match self.advisor.ask(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Advisor request failed");
                format!("Advisor unavailable: {e}")
            }
        }
    }
}
