//! Error types for the `novel-rag` crate.
//!
//! Every internal failure is wrapped into one of six kinds with a short
//! message plus the underlying detail. Only the reranker recovers locally;
//! everything else propagates to the caller.

use thiserror::Error;

/// Errors that can occur in ingestion, retrieval and question answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// Model credentials or configuration values are missing or invalid.
    #[error("Configuration error: {message}{}", render_details(.details))]
    Configuration {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },

    /// The vector index could not be loaded, created or searched.
    #[error("Vector store error: {message}{}", render_details(.details))]
    VectorStore {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },

    /// No eligible input files were found or a file could not be loaded.
    #[error("Ingest error: {message}{}", render_details(.details))]
    Ingest {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },

    /// Similarity search or candidate selection failed.
    #[error("Retrieval error: {message}{}", render_details(.details))]
    Retrieval {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },

    /// The relevance judge failed or returned unusable output.
    ///
    /// Never surfaced by [`LlmReranker`](crate::reranker::LlmReranker), which
    /// falls back to the original candidate order instead.
    #[error("Reranker error: {message}{}", render_details(.details))]
    Reranker {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },

    /// A call to the generative or embedding model failed.
    #[error("LLM error: {message}{}", render_details(.details))]
    Llm {
        /// A short description of the failure.
        message: String,
        /// Underlying error detail.
        details: String,
    },
}

fn render_details(details: &str) -> String {
    if details.is_empty() { String::new() } else { format!(": {details}") }
}

impl RagError {
    /// Build a [`RagError::Configuration`].
    pub fn configuration(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Configuration { message: message.into(), details: details.into() }
    }

    /// Build a [`RagError::VectorStore`].
    pub fn vector_store(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::VectorStore { message: message.into(), details: details.into() }
    }

    /// Build a [`RagError::Ingest`].
    pub fn ingest(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Ingest { message: message.into(), details: details.into() }
    }

    /// Build a [`RagError::Retrieval`].
    pub fn retrieval(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Retrieval { message: message.into(), details: details.into() }
    }

    /// Build a [`RagError::Reranker`].
    pub fn reranker(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Reranker { message: message.into(), details: details.into() }
    }

    /// Build a [`RagError::Llm`].
    pub fn llm(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Llm { message: message.into(), details: details.into() }
    }

    /// Whether this error means model credentials are absent or invalid.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
