//! Model provider: the single owner of model configuration and handles.
//!
//! [`ModelProvider`] builds the embedding and generative handles on first use
//! through a [`ModelFactory`] and caches them until [`reset`](ModelProvider::reset).

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::ModelConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::lazy::LazySlot;
use crate::llm::GenerativeModel;

/// Constructs model handles from configuration.
///
/// Implementations return [`RagError::Configuration`](crate::RagError::Configuration)
/// when required credentials are missing.
#[async_trait]
pub trait ModelFactory: Send + Sync {
    /// Build the embedding handle.
    async fn embeddings(&self, config: &ModelConfig) -> Result<Arc<dyn EmbeddingProvider>>;

    /// Build the generative model handle.
    async fn llm(&self, config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>>;
}

/// Lazily constructs and caches model handles.
pub struct ModelProvider {
    config: ModelConfig,
    factory: Arc<dyn ModelFactory>,
    embeddings: LazySlot<dyn EmbeddingProvider>,
    llm: LazySlot<dyn GenerativeModel>,
}

impl ModelProvider {
    /// Create a provider that builds handles with `factory`.
    pub fn new(config: ModelConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self {
            config,
            factory,
            embeddings: LazySlot::new("embeddings"),
            llm: LazySlot::new("llm"),
        }
    }

    /// Create a provider backed by the Gemini REST API.
    #[cfg(feature = "gemini")]
    pub fn gemini(config: ModelConfig) -> Self {
        Self::new(config, Arc::new(crate::gemini::GeminiModelFactory))
    }

    /// The model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The embedding handle, built on first use.
    ///
    /// # Errors
    ///
    /// Propagates factory errors, typically
    /// [`RagError::Configuration`](crate::RagError::Configuration).
    pub async fn embeddings(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.embeddings.get_or_try_init(|| self.factory.embeddings(&self.config)).await
    }

    /// The generative model handle, built on first use.
    ///
    /// # Errors
    ///
    /// Propagates factory errors, typically
    /// [`RagError::Configuration`](crate::RagError::Configuration).
    pub async fn llm(&self) -> Result<Arc<dyn GenerativeModel>> {
        self.llm.get_or_try_init(|| self.factory.llm(&self.config)).await
    }

    /// Drop both handles; the next access rebuilds them.
    pub async fn reset(&self) {
        info!("resetting model handles");
        self.embeddings.invalidate().await;
        self.llm.invalidate().await;
    }
}
