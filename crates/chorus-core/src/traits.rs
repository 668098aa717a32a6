use crate::{context::GenerationContext, error::ChorusError};
use async_trait::async_trait;

/// Generation capability: the voice of one participant.
///
/// Every backend (Ollama, OpenAI-compatible APIs, scripted replies) implements
/// this trait. The scheduler only decides whether, when, and in what stance a
/// participant replies; producing the text is the generator's job.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Produce the participant's next message from the conversation context.
    async fn generate(&self, context: &GenerationContext) -> Result<String, ChorusError>;

    /// Check if the backend is reachable.
    async fn is_available(&self) -> bool {
        true
    }
}
