//! Generative model trait used for answering and relevance judging.

use async_trait::async_trait;

use crate::error::Result;

/// A text-in, text-out generative language model.
///
/// Both the QA orchestrator and the relevance judge send a single rendered
/// prompt and read back the whole completion.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// The model identifier.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Llm`](crate::RagError::Llm) if the call fails or
    /// the response carries no text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
