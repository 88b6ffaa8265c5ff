//! Deterministic model doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use novel_rag::{
    Chunk, EmbeddingProvider, GenerativeModel, ModelConfig, ModelFactory, RagConfig, RagError,
    Reranker, Result, SOURCE_KEY,
};

pub const DIM: usize = 32;

/// Embeds text as a normalized bag of character buckets.
///
/// Texts sharing characters land close together, which is enough to make
/// retrieval order predictable in tests.
pub struct HashEmbedder;

pub fn embed_text(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    v[0] = 0.01;
    for c in text.chars() {
        v[1 + (c as usize) % (DIM - 1)] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// An embedder whose every call fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::llm("embedding request failed", "connection refused"))
    }

    fn model_name(&self) -> &str {
        "failing-embedder"
    }
}

/// Embeds documents like [`HashEmbedder`] but fails every query.
pub struct QueryFailingEmbedder;

#[async_trait]
impl EmbeddingProvider for QueryFailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed_text(text))
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::llm("embedding request failed", "quota exceeded"))
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// A reranker that always errors.
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(&self, _question: &str, _candidates: Vec<Chunk>) -> Result<Vec<Chunk>> {
        Err(RagError::reranker("reranker unavailable", "scoring backend down"))
    }
}

/// A chat model that answers judge prompts with a scripted reply and
/// answer prompts with a fixed answer.
pub struct ScriptedModel {
    judge_reply: Mutex<std::result::Result<String, String>>,
    fail_answers: bool,
    pub judge_calls: AtomicUsize,
    pub answer_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(judge_reply: impl Into<String>) -> Self {
        Self {
            judge_reply: Mutex::new(Ok(judge_reply.into())),
            fail_answers: false,
            judge_calls: AtomicUsize::new(0),
            answer_calls: AtomicUsize::new(0),
        }
    }

    /// A model whose judge calls fail.
    pub fn failing_judge() -> Self {
        let model = Self::new("");
        *model.judge_reply.lock().unwrap() = Err("judge unavailable".to_string());
        model
    }

    /// A model that judges with `judge_reply` but fails every answer call.
    pub fn failing_answers(judge_reply: impl Into<String>) -> Self {
        Self { fail_answers: true, ..Self::new(judge_reply) }
    }

    pub fn judge_calls(&self) -> usize {
        self.judge_calls.load(Ordering::SeqCst)
    }

    pub fn answer_calls(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
    }
}

pub const ANSWER: &str = "The lighthouse keeper hid the letters.";

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains("judging how relevant") {
            self.judge_calls.fetch_add(1, Ordering::SeqCst);
            return self
                .judge_reply
                .lock()
                .unwrap()
                .clone()
                .map_err(|e| RagError::llm("generation failed", e));
        }
        self.answer_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_answers {
            return Err(RagError::llm("generation failed", "model overloaded"));
        }
        Ok(format!("  {ANSWER}\n"))
    }
}

/// Builds mock handles and, like the real backend, refuses to build them
/// without an API key.
pub struct MockFactory {
    pub model: Arc<ScriptedModel>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub embedding_builds: AtomicUsize,
    pub llm_builds: AtomicUsize,
}

impl MockFactory {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        Self::with_embedder(model, Arc::new(HashEmbedder))
    }

    pub fn with_embedder(model: Arc<ScriptedModel>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            model,
            embedder,
            embedding_builds: AtomicUsize::new(0),
            llm_builds: AtomicUsize::new(0),
        }
    }

    fn check_key(config: &ModelConfig) -> Result<()> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::configuration("API key not configured", "set GOOGLE_API_KEY"));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelFactory for MockFactory {
    async fn embeddings(&self, config: &ModelConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        Self::check_key(config)?;
        self.embedding_builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.embedder))
    }

    async fn llm(&self, config: &ModelConfig) -> Result<Arc<dyn GenerativeModel>> {
        Self::check_key(config)?;
        self.llm_builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.model) as Arc<dyn GenerativeModel>)
    }
}

/// A configuration with small chunks, an API key, and the index in `index_dir`.
pub fn test_config(index_dir: &Path) -> RagConfig {
    RagConfig::builder()
        .api_key("test-key")
        .chunk_size(120)
        .chunk_overlap(20)
        .final_result_count(3)
        .candidate_count(6)
        .index_dir(index_dir)
        .build()
        .unwrap()
}

/// Write a small corpus of three texts into `dir`.
pub fn write_corpus(dir: &Path) {
    std::fs::create_dir_all(dir.join("volume2")).unwrap();
    std::fs::write(
        dir.join("lighthouse.txt"),
        "The lighthouse keeper climbed the stairs every night.\n\n\
         He kept a box of letters under the lamp, letters he never sent.\n\n\
         When the storm came, the letters were the first thing he saved.",
    )
    .unwrap();
    std::fs::write(
        dir.join("volume2/harbour.txt"),
        "The harbour master counted the boats at dawn.\n\
         Fishing nets dried on the wall while gulls circled overhead.\n\
         Nobody in the harbour knew about the keeper's letters.",
    )
    .unwrap();
    std::fs::write(
        dir.join("volume2/orchard.TXT"),
        "Apples fell in the orchard all autumn. The farmer's daughter \
         gathered them in baskets and sold them at the market by the church.",
    )
    .unwrap();
    std::fs::write(dir.join("README.md"), "not part of the corpus").unwrap();
}

/// Numbered chunks `c1..=cn`, each tagged with a source.
pub fn numbered_chunks(n: usize) -> Vec<Chunk> {
    (1..=n)
        .map(|i| Chunk {
            id: format!("c{i}"),
            text: format!("candidate passage number {i}"),
            metadata: HashMap::from([(SOURCE_KEY.to_string(), format!("book{i}.txt"))]),
            index: i - 1,
            document_id: format!("book{i}.txt"),
        })
        .collect()
}
