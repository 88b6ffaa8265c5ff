//! Data types for documents, chunks and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding a document's source path.
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Label used when a chunk carries no source metadata.
pub const UNKNOWN_SOURCE: &str = "unknown source";

/// A loaded source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier of the document, its source path.
    pub id: String,
    /// The full text of the document.
    pub text: String,
    /// Key-value metadata; always contains [`SOURCE_KEY`] for ingested files.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document whose `source` metadata is its identifier.
    pub fn from_source(source: impl Into<String>, text: impl Into<String>) -> Self {
        let id = source.into();
        let metadata = HashMap::from([(SOURCE_KEY.to_string(), id.clone())]);
        Self { id, text: text.into(), metadata }
    }
}

/// A contiguous span of a [`Document`], the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}#{index}`.
    pub id: String,
    /// The text span.
    pub text: String,
    /// Metadata inherited from the parent document plus [`CHUNK_INDEX_KEY`].
    pub metadata: HashMap<String, String>,
    /// Position of this chunk within its document.
    pub index: usize,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// The chunk's source label, falling back to [`UNKNOWN_SOURCE`].
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A [`Chunk`] with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The embedding; its length is uniform across an index.
    pub embedding: Vec<f32>,
}

/// A passage reported alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    /// The passage text.
    pub content: String,
    /// Where the passage came from.
    pub source: String,
}

impl From<&Chunk> for SourceRecord {
    fn from(chunk: &Chunk) -> Self {
        Self { content: chunk.text.clone(), source: chunk.source().to_string() }
    }
}

/// The answer to one question plus the passages used to ground it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaResponse {
    /// The generated answer.
    pub answer: String,
    /// One record per passage given to the model, in prompt order.
    pub sources: Vec<SourceRecord>,
}
