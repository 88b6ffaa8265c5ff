//! Configuration for ingestion, retrieval, reranking and answering.
//!
//! [`RagConfig`] groups the settings consumed by the core into sections.
//! Defaults match a Gemini deployment; [`RagConfig::from_env`] applies
//! environment overrides on top of them.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model identifiers and transport settings for the model provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// API key for the model service. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Generative model identifier used for answers and relevance judging.
    pub llm_model: String,
    /// Sampling temperature for the generative model.
    pub llm_temperature: f32,
    /// Base URL of the model service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum number of texts per embedding request.
    pub embed_batch_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            embedding_model: "gemini-embedding-001".to_string(),
            llm_model: "gemini-2.5-flash".to_string(),
            llm_temperature: 0.3,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            embed_batch_size: 100,
        }
    }
}

/// Text splitting parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Break points in priority order. The empty string means a hard cut.
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        let separators =
            ["\n\n", "\n", "。", "！", "？", ". ", "! ", "? ", "；", "，", "; ", ", ", " ", ""];
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            separators: separators.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages handed to the answer prompt.
    pub final_result_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { final_result_count: 5 }
    }
}

/// Relevance reranking parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RerankConfig {
    /// Whether candidates are over-fetched and rescored by the judge.
    pub enabled: bool,
    /// Number of candidates fetched before reranking.
    pub candidate_count: usize,
    /// Characters of each candidate shown to the judge.
    pub preview_length: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self { enabled: true, candidate_count: 15, preview_length: 300 }
    }
}

/// Filesystem locations used by ingestion and the index store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    /// Default corpus directory.
    pub data_dir: PathBuf,
    /// Directory holding the persisted index.
    pub index_dir: PathBuf,
    /// File extensions treated as eligible text files.
    pub file_extensions: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            index_dir: PathBuf::from("vectorstore"),
            file_extensions: vec!["txt".to_string()],
        }
    }
}

/// Complete configuration for the RAG core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Model provider settings.
    pub models: ModelConfig,
    /// Chunking settings.
    pub chunk: ChunkConfig,
    /// Retrieval settings.
    pub retrieval: RetrievalConfig,
    /// Reranking settings.
    pub rerank: RerankConfig,
    /// Filesystem locations.
    pub paths: PathConfig,
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load defaults, then apply environment overrides.
    ///
    /// The API key is read from `GOOGLE_API_KEY`, falling back to
    /// `GEMINI_API_KEY`. Other settings use `NOVEL_RAG_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if an override cannot be parsed or
    /// the resulting configuration is inconsistent.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(key) = env_var("GOOGLE_API_KEY").or_else(|| env_var("GEMINI_API_KEY")) {
            config.models.api_key = key;
        }
        if let Some(model) = env_var("NOVEL_RAG_EMBEDDING_MODEL") {
            config.models.embedding_model = model;
        }
        if let Some(model) = env_var("NOVEL_RAG_LLM_MODEL") {
            config.models.llm_model = model;
        }
        if let Some(value) = env_parse("NOVEL_RAG_LLM_TEMPERATURE")? {
            config.models.llm_temperature = value;
        }
        if let Some(value) = env_parse("NOVEL_RAG_CHUNK_SIZE")? {
            config.chunk.chunk_size = value;
        }
        if let Some(value) = env_parse("NOVEL_RAG_CHUNK_OVERLAP")? {
            config.chunk.chunk_overlap = value;
        }
        if let Some(value) = env_parse("NOVEL_RAG_SEARCH_K")? {
            config.retrieval.final_result_count = value;
        }
        if let Some(value) = env_parse("NOVEL_RAG_RERANK_ENABLED")? {
            config.rerank.enabled = value;
        }
        if let Some(value) = env_parse("NOVEL_RAG_RERANK_CANDIDATES")? {
            config.rerank.candidate_count = value;
        }
        if let Some(dir) = env_var("NOVEL_RAG_DATA_DIR") {
            config.paths.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_var("NOVEL_RAG_INDEX_DIR") {
            config.paths.index_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Whether model credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.models.api_key.trim().is_empty()
    }

    /// Check that parameters are consistent with each other.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `final_result_count == 0`
    /// - reranking is enabled and `candidate_count <= final_result_count`
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(RagError::configuration(
                "invalid chunk settings",
                "chunk_size must be greater than zero",
            ));
        }
        if self.chunk.chunk_overlap >= self.chunk.chunk_size {
            return Err(RagError::configuration(
                "invalid chunk settings",
                format!(
                    "chunk_overlap ({}) must be less than chunk_size ({})",
                    self.chunk.chunk_overlap, self.chunk.chunk_size
                ),
            ));
        }
        if self.retrieval.final_result_count == 0 {
            return Err(RagError::configuration(
                "invalid retrieval settings",
                "final_result_count must be greater than zero",
            ));
        }
        if self.rerank.enabled && self.rerank.candidate_count <= self.retrieval.final_result_count {
            return Err(RagError::configuration(
                "invalid rerank settings",
                format!(
                    "candidate_count ({}) must exceed final_result_count ({})",
                    self.rerank.candidate_count, self.retrieval.final_result_count
                ),
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| {
                RagError::configuration(format!("invalid value for {name}"), format!("'{raw}': {e}"))
            }),
        None => Ok(None),
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the model service API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.models.api_key = key.into();
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.models.embedding_model = model.into();
        self
    }

    /// Set the generative model identifier.
    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.models.llm_model = model.into();
        self
    }

    /// Set the generative model temperature.
    pub fn llm_temperature(mut self, temperature: f32) -> Self {
        self.config.models.llm_temperature = temperature;
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk.chunk_overlap = overlap;
        self
    }

    /// Replace the separator priority list.
    pub fn separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.chunk.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of passages used to answer a question.
    pub fn final_result_count(mut self, count: usize) -> Self {
        self.config.retrieval.final_result_count = count;
        self
    }

    /// Enable or disable relevance reranking.
    pub fn rerank_enabled(mut self, enabled: bool) -> Self {
        self.config.rerank.enabled = enabled;
        self
    }

    /// Set the number of candidates fetched before reranking.
    pub fn candidate_count(mut self, count: usize) -> Self {
        self.config.rerank.candidate_count = count;
        self
    }

    /// Set the preview length shown to the relevance judge.
    pub fn preview_length(mut self, length: usize) -> Self {
        self.config.rerank.preview_length = length;
        self
    }

    /// Set the default corpus directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.data_dir = dir.into();
        self
    }

    /// Set the persisted index directory.
    pub fn index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.index_dir = dir.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
