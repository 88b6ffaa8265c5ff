//! The persisted similarity index.
//!
//! A [`VectorIndex`] keeps every [`EmbeddedChunk`] in memory and answers
//! nearest-neighbour queries by cosine similarity. On disk it is a single
//! `index.json` inside the index directory: a manifest describing the
//! embedding space followed by the entries. Callers treat the directory as
//! opaque.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Chunk, EmbeddedChunk};
use crate::error::{RagError, Result};

/// File name of the persisted index inside the index directory.
pub const INDEX_FILE: &str = "index.json";

/// Version of the on-disk index layout.
pub const FORMAT_VERSION: u32 = 1;

/// Describes the embedding space of a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    /// On-disk format version.
    pub format_version: u32,
    /// Embedding model that produced the vectors.
    pub embedding_model: String,
    /// Dimensionality of every vector in the index.
    pub dimensions: usize,
    /// Number of entries.
    pub chunk_count: usize,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    entries: Vec<EmbeddedChunk>,
}

/// An in-memory, cosine-similarity index over embedded chunks.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<EmbeddedChunk>,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Sort key for a similarity; NaN ranks below every real score.
fn rank(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

impl VectorIndex {
    /// Build an index from embedded chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if any embedding is empty or the
    /// embeddings differ in dimensionality.
    pub fn new(embedding_model: impl Into<String>, entries: Vec<EmbeddedChunk>) -> Result<Self> {
        let dimensions = entries.first().map_or(0, |e| e.embedding.len());
        let inconsistent =
            entries.iter().find(|e| e.embedding.is_empty() || e.embedding.len() != dimensions);
        if let Some(bad) = inconsistent {
            return Err(RagError::vector_store(
                "inconsistent embeddings",
                format!(
                    "chunk '{}' has {} dimensions, expected {dimensions}",
                    bad.chunk.id,
                    bad.embedding.len()
                ),
            ));
        }
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimensions,
            chunk_count: entries.len(),
        };
        Ok(Self { manifest, entries })
    }

    /// The manifest describing this index.
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `k` chunks most similar to `query`, most similar first.
    ///
    /// Equal scores keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if `query` does not match the
    /// index dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.manifest.dimensions {
            return Err(RagError::vector_store(
                "query dimensionality mismatch",
                format!(
                    "query has {} dimensions, index has {}",
                    query.len(),
                    self.manifest.dimensions
                ),
            ));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, query)))
            .collect();

        scored.sort_by(|a, b| rank(b.1).total_cmp(&rank(a.1)));
        scored.truncate(k);
        debug!(k, returned = scored.len(), "similarity search");

        Ok(scored.into_iter().map(|(i, score)| (self.entries[i].chunk.clone(), score)).collect())
    }

    /// Path of the index file inside `dir`.
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Write the index to `dir`, replacing any previous index there.
    ///
    /// The file is written next to its destination and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] on any I/O or encoding failure.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            RagError::vector_store(format!("failed to create '{}'", dir.display()), e.to_string())
        })?;

        let file = IndexFile { manifest: self.manifest.clone(), entries: self.entries.clone() };
        let bytes = serde_json::to_vec(&file)
            .map_err(|e| RagError::vector_store("failed to encode index", e.to_string()))?;

        let target = Self::file_path(dir);
        let staging = dir.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&staging, bytes).await.map_err(|e| {
            RagError::vector_store(format!("failed to write '{}'", staging.display()), e.to_string())
        })?;
        tokio::fs::rename(&staging, &target).await.map_err(|e| {
            RagError::vector_store(format!("failed to replace '{}'", target.display()), e.to_string())
        })?;

        info!(path = %target.display(), chunk_count = self.len(), "index saved");
        Ok(())
    }

    /// Read a persisted index from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the index is missing, cannot be
    /// decoded, or its manifest disagrees with its entries.
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = Self::file_path(dir);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            RagError::vector_store(format!("failed to read '{}'", path.display()), e.to_string())
        })?;
        let file: IndexFile = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::vector_store(format!("corrupt index '{}'", path.display()), e.to_string())
        })?;

        let IndexFile { manifest, entries } = file;
        if manifest.format_version != FORMAT_VERSION {
            return Err(RagError::vector_store(
                "unsupported index format",
                format!("found version {}, expected {FORMAT_VERSION}", manifest.format_version),
            ));
        }
        if manifest.chunk_count != entries.len() {
            return Err(RagError::vector_store(
                format!("corrupt index '{}'", path.display()),
                format!("manifest lists {} chunks, found {}", manifest.chunk_count, entries.len()),
            ));
        }

        let index = Self::new(manifest.embedding_model.clone(), entries)?;
        if !index.is_empty() && index.manifest.dimensions != manifest.dimensions {
            return Err(RagError::vector_store(
                format!("corrupt index '{}'", path.display()),
                format!(
                    "manifest lists {} dimensions, entries have {}",
                    manifest.dimensions, index.manifest.dimensions
                ),
            ));
        }

        info!(path = %path.display(), chunk_count = index.len(), "index loaded");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn entry(id: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id: id.to_string(),
                text: format!("text of {id}"),
                metadata: HashMap::new(),
                index: 0,
                document_id: "doc".to_string(),
            },
            embedding,
        }
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let err = VectorIndex::new("m", vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0])])
            .unwrap_err();
        assert!(err.to_string().contains("inconsistent embeddings"));
    }

    #[test]
    fn search_orders_by_similarity_and_checks_dimensions() {
        let index = VectorIndex::new(
            "m",
            vec![entry("x", vec![1.0, 0.0]), entry("y", vec![0.0, 1.0]), entry("xy", vec![1.0, 1.0])],
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.1], 2).unwrap();
        let ids: Vec<_> = hits.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy"]);

        assert!(index.search(&[1.0, 0.0, 0.0], 2).is_err());
    }

    #[test]
    fn overflowing_similarity_ranks_last() {
        let index = VectorIndex::new(
            "m",
            vec![
                entry("huge", vec![3.0e38, 3.0e38]),
                entry("a", vec![1.0, 0.0]),
                entry("b", vec![0.0, 1.0]),
            ],
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.5], 3).unwrap();
        let ids: Vec<_> = hits.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "huge"]);
        assert!(hits[2].1.is_nan());
    }

    #[tokio::test]
    async fn save_then_open_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let index =
            VectorIndex::new("m", vec![entry("a", vec![0.5, 0.5]), entry("b", vec![0.1, 0.9])])
                .unwrap();
        index.save(dir.path()).await.unwrap();
        assert!(VectorIndex::file_path(dir.path()).is_file());

        let reopened = VectorIndex::open(dir.path()).await.unwrap();
        assert_eq!(reopened.manifest(), index.manifest());
        assert_eq!(reopened.len(), 2);
    }

    #[tokio::test]
    async fn open_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), b"{not json").unwrap();
        let err = VectorIndex::open(dir.path()).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStore { .. }));
    }
}
