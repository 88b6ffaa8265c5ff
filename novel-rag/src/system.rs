//! The collaborator-facing entry point.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::RagConfig;
use crate::document::QaResponse;
use crate::error::Result;
use crate::ingest::IngestPipeline;
use crate::provider::{ModelFactory, ModelProvider};
use crate::qa::QaService;
use crate::retriever::Retriever;
use crate::reranker::Reranker;
use crate::store::VectorIndexStore;

/// Owns the model provider, index store, ingestion pipeline and QA service
/// built from one [`RagConfig`].
///
/// # Example
///
/// ```rust,ignore
/// use novel_rag::{RagConfig, RagSystem};
///
/// let system = RagSystem::gemini(RagConfig::from_env()?);
/// let chunks = system.ingest("data".as_ref()).await?;
/// let response = system.ask("Who is the narrator's brother?").await?;
/// println!("{}", response.answer);
/// ```
pub struct RagSystem {
    config: RagConfig,
    models: Arc<ModelProvider>,
    store: Arc<VectorIndexStore>,
    pipeline: IngestPipeline,
    qa: QaService,
}

impl RagSystem {
    /// Wire up a system whose model handles come from `factory`.
    pub fn new(config: RagConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self::build(config, factory, None)
    }

    /// Like [`new`](Self::new), reranking with `reranker` instead of the
    /// model-judged default.
    pub fn with_reranker(
        config: RagConfig,
        factory: Arc<dyn ModelFactory>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self::build(config, factory, Some(reranker))
    }

    /// Wire up a system backed by the Gemini REST API.
    #[cfg(feature = "gemini")]
    pub fn gemini(config: RagConfig) -> Self {
        Self::new(config, Arc::new(crate::gemini::GeminiModelFactory))
    }

    fn build(
        config: RagConfig,
        factory: Arc<dyn ModelFactory>,
        reranker: Option<Arc<dyn Reranker>>,
    ) -> Self {
        let models = Arc::new(ModelProvider::new(config.models.clone(), factory));
        let store = Arc::new(VectorIndexStore::new(&config.paths.index_dir, Arc::clone(&models)));
        let pipeline = IngestPipeline::new(&config, Arc::clone(&store), Arc::clone(&models));

        let mut retriever = Retriever::new(&config, Arc::clone(&store), Arc::clone(&models));
        if let Some(reranker) = reranker {
            retriever = retriever.with_reranker(reranker);
        }
        let qa = QaService::new(Arc::new(retriever), Arc::clone(&store), Arc::clone(&models));

        info!(
            index_dir = %config.paths.index_dir.display(),
            rerank = config.rerank.enabled,
            final_result_count = config.retrieval.final_result_count,
            "rag system created"
        );
        Self { config, models, store, pipeline, qa }
    }

    /// The configuration this system was built from.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The shared model provider.
    pub fn models(&self) -> &Arc<ModelProvider> {
        &self.models
    }

    /// The shared index store.
    pub fn store(&self) -> &Arc<VectorIndexStore> {
        &self.store
    }

    /// The question answering service.
    pub fn qa(&self) -> &QaService {
        &self.qa
    }

    /// Rebuild the index from `corpus` and reload the QA service so the next
    /// question sees the new index. Returns the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// See [`IngestPipeline::ingest`].
    pub async fn ingest(&self, corpus: &Path) -> Result<usize> {
        let count = self.pipeline.ingest(corpus).await?;
        self.qa.reload().await;
        Ok(count)
    }

    /// Rebuild the index from the configured data directory.
    ///
    /// # Errors
    ///
    /// See [`IngestPipeline::ingest`].
    pub async fn ingest_default(&self) -> Result<usize> {
        self.ingest(&self.config.paths.data_dir).await
    }

    /// Answer `question`.
    ///
    /// # Errors
    ///
    /// See [`QaService::ask`].
    pub async fn ask(&self, question: &str) -> Result<QaResponse> {
        self.qa.ask(question).await
    }

    /// Drop every cached handle; the next question rebuilds them. Idempotent.
    pub async fn reload(&self) {
        self.qa.reload().await;
    }
}
