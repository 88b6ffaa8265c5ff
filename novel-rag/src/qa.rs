//! Question answering over retrieved passages.
//!
//! [`QaService`] retrieves passages once per question and uses that single
//! candidate set both as prompt context and as the reported sources.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::{Chunk, QaResponse, SourceRecord};
use crate::error::{RagError, Result};
use crate::lazy::{LazySlot, SlotState};
use crate::llm::GenerativeModel;
use crate::prompts::{answer_prompt, format_context};
use crate::provider::ModelProvider;
use crate::retriever::{Retriever, log_preview};
use crate::store::VectorIndexStore;

/// The assembled answer step: passages in, grounded answer out.
struct AnswerChain {
    llm: Arc<dyn GenerativeModel>,
}

impl AnswerChain {
    async fn invoke(&self, question: &str, passages: &[Chunk]) -> Result<String> {
        let prompt = answer_prompt(&format_context(passages), question);
        debug!(model = self.llm.name(), prompt_len = prompt.len(), "generating answer");
        let answer = self.llm.generate(&prompt).await.map_err(|e| {
            error!(error = %e, "answer generation failed");
            if e.is_configuration() {
                e
            } else {
                RagError::llm("failed to generate answer", e.to_string())
            }
        })?;
        Ok(answer.trim().to_string())
    }
}

/// Answers questions and owns the teardown of every cached handle.
pub struct QaService {
    retriever: Arc<Retriever>,
    store: Arc<VectorIndexStore>,
    models: Arc<ModelProvider>,
    chain: LazySlot<AnswerChain>,
}

impl QaService {
    /// Create a service. Nothing is built until the first question.
    pub fn new(
        retriever: Arc<Retriever>,
        store: Arc<VectorIndexStore>,
        models: Arc<ModelProvider>,
    ) -> Self {
        Self { retriever, store, models, chain: LazySlot::new("qa_chain") }
    }

    /// Answer `question` from the indexed corpus.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] if model credentials are absent
    /// - [`RagError::Retrieval`] if retrieval fails or finds no passages
    /// - [`RagError::Llm`] if answer generation fails
    pub async fn ask(&self, question: &str) -> Result<QaResponse> {
        info!(question = %log_preview(question), "answering question");
        let chain = self.chain().await?;

        let passages = self.retriever.retrieve(question).await?;
        if passages.is_empty() {
            let err = RagError::retrieval(
                "no relevant passages found",
                "the vector index returned no results",
            );
            error!(error = %err, "cannot answer without context");
            return Err(err);
        }

        let answer = chain.invoke(question, &passages).await?;
        let sources = passages.iter().map(SourceRecord::from).collect::<Vec<_>>();
        info!(answer_len = answer.chars().count(), sources = sources.len(), "question answered");
        Ok(QaResponse { answer, sources })
    }

    /// Tear down the chain, retriever, model handles and index handle.
    ///
    /// The next [`ask`](Self::ask) rebuilds everything from configuration
    /// and the persisted index. Requests already in flight finish against
    /// the handles they started with. Idempotent.
    pub async fn reload(&self) {
        info!("reloading question answering service");
        self.chain.invalidate().await;
        self.retriever.reset().await;
        self.models.reset().await;
        self.store.reset().await;
    }

    /// State of the cached answer chain.
    pub async fn state(&self) -> SlotState {
        self.chain.state().await
    }

    async fn chain(&self) -> Result<Arc<AnswerChain>> {
        self.chain
            .get_or_try_init(|| async {
                let llm = self.models.llm().await.inspect_err(|e| {
                    error!(error = %e, "failed to initialize answer chain");
                })?;
                info!(model = llm.name(), "answer chain initialized");
                Ok(Arc::new(AnswerChain { llm }))
            })
            .await
    }
}
