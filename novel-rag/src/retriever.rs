//! Question retrieval: nearest-neighbour search plus optional reranking.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{RagConfig, RerankConfig};
use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::lazy::{LazySlot, SlotState};
use crate::provider::ModelProvider;
use crate::reranker::{LlmReranker, Reranker};
use crate::store::{VectorIndexStore, search_index};

const LOG_QUESTION_CHARS: usize = 50;

/// Shorten a question for log output.
pub(crate) fn log_preview(question: &str) -> String {
    let mut preview: String = question.chars().take(LOG_QUESTION_CHARS).collect();
    if question.chars().nth(LOG_QUESTION_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}

/// Everything a retrieval needs, captured together so a reset never
/// leaves a request with a mix of old and new handles.
struct SearchHandle {
    index: Arc<VectorIndex>,
    embeddings: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn Reranker>>,
    fetch_k: usize,
}

/// Returns the passages most relevant to a question.
///
/// With reranking enabled the retriever over-fetches `candidate_count`
/// nearest chunks and lets the reranker keep `final_result_count` of them;
/// otherwise it fetches `final_result_count` directly.
pub struct Retriever {
    store: Arc<VectorIndexStore>,
    models: Arc<ModelProvider>,
    final_result_count: usize,
    rerank: RerankConfig,
    reranker: Option<Arc<dyn Reranker>>,
    handle: LazySlot<SearchHandle>,
}

impl Retriever {
    /// Create a retriever over `store`. The search handle is built on first use.
    pub fn new(
        config: &RagConfig,
        store: Arc<VectorIndexStore>,
        models: Arc<ModelProvider>,
    ) -> Self {
        Self {
            store,
            models,
            final_result_count: config.retrieval.final_result_count,
            rerank: config.rerank.clone(),
            reranker: None,
            handle: LazySlot::new("retriever"),
        }
    }

    /// Use `reranker` instead of the default [`LlmReranker`] when reranking is enabled.
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Retrieve up to `final_result_count` passages for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Retrieval`] wrapping any index, embedding or
    /// reranker failure. Missing credentials surface unchanged as
    /// [`RagError::Configuration`].
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Chunk>> {
        info!(question = %log_preview(question), "retrieving passages");
        let handle = self.handle().await.map_err(into_retrieval_error)?;

        let candidates =
            search_index(&handle.index, handle.embeddings.as_ref(), question, handle.fetch_k)
                .await
                .map_err(into_retrieval_error)?;
        debug!(candidates = candidates.len(), fetch_k = handle.fetch_k, "vector search complete");

        let passages = match &handle.reranker {
            Some(reranker) if candidates.len() > self.final_result_count => {
                reranker.rerank(question, candidates).await.map_err(into_retrieval_error)?
            }
            _ => candidates,
        };

        info!(passages = passages.len(), "retrieval complete");
        Ok(passages)
    }

    /// Drop the cached search handle; the next retrieval rebuilds it.
    pub async fn reset(&self) {
        info!("resetting retriever");
        self.handle.invalidate().await;
    }

    /// State of the cached search handle.
    pub async fn state(&self) -> SlotState {
        self.handle.state().await
    }

    async fn handle(&self) -> Result<Arc<SearchHandle>> {
        self.handle
            .get_or_try_init(|| async {
                let index = self.store.load().await?;
                let embeddings = self.models.embeddings().await?;
                let reranker = if self.rerank.enabled {
                    Some(self.build_reranker().await?)
                } else {
                    None
                };
                let fetch_k = if reranker.is_some() {
                    self.rerank.candidate_count
                } else {
                    self.final_result_count
                };
                info!(
                    chunk_count = index.len(),
                    fetch_k,
                    rerank = reranker.is_some(),
                    "retriever initialized"
                );
                Ok(Arc::new(SearchHandle { index, embeddings, reranker, fetch_k }))
            })
            .await
    }

    async fn build_reranker(&self) -> Result<Arc<dyn Reranker>> {
        if let Some(reranker) = &self.reranker {
            return Ok(Arc::clone(reranker));
        }
        let judge = self.models.llm().await?;
        Ok(Arc::new(LlmReranker::new(judge, self.final_result_count, self.rerank.preview_length)))
    }
}

fn into_retrieval_error(err: RagError) -> RagError {
    error!(error = %err, "retrieval failed");
    if err.is_configuration() {
        err
    } else {
        RagError::retrieval("failed to retrieve passages", err.to_string())
    }
}
