//! Retrieval-augmented question answering over a private corpus of
//! long-form text.
//!
//! This crate provides:
//! - Recursive, separator-priority chunking with exact overlap
//! - A persisted cosine-similarity vector index
//! - Retrieval with optional model-judged reranking and a safe fallback
//! - Grounded answer generation that reports its sources
//! - Lazily built, explicitly resettable model and index handles
//!
//! [`RagSystem`] wires everything together; the pieces are also usable on
//! their own. The Gemini REST backend is behind the default `gemini` feature.

mod chunking;
mod config;
mod document;
mod embedding;
mod error;
#[cfg(feature = "gemini")]
mod gemini;
mod index;
mod ingest;
mod lazy;
mod llm;
pub mod prompts;
mod provider;
mod qa;
mod reranker;
mod retriever;
mod store;
mod system;

pub use chunking::{Chunker, RecursiveCharacterSplitter};
pub use config::{
    ChunkConfig, DEFAULT_BASE_URL, ModelConfig, PathConfig, RagConfig, RagConfigBuilder,
    RerankConfig, RetrievalConfig,
};
pub use document::{
    CHUNK_INDEX_KEY, Chunk, Document, EmbeddedChunk, QaResponse, SOURCE_KEY, SourceRecord,
    UNKNOWN_SOURCE,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
#[cfg(feature = "gemini")]
pub use gemini::{GeminiChatModel, GeminiEmbeddingProvider, GeminiModelFactory};
pub use index::{FORMAT_VERSION, INDEX_FILE, IndexManifest, VectorIndex};
pub use ingest::{IngestPipeline, discover_files};
pub use lazy::{LazySlot, SlotState};
pub use llm::GenerativeModel;
pub use provider::{ModelFactory, ModelProvider};
pub use qa::QaService;
pub use reranker::{
    JudgeVerdict, LlmReranker, MAX_SCORE, RelevanceScore, Reranker, parse_judge_response,
    select_by_scores,
};
pub use retriever::Retriever;
pub use store::VectorIndexStore;
pub use system::RagSystem;
