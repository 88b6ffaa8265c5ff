//! Vector index store: owns the persisted index directory.
//!
//! The store loads the index lazily, replaces it wholesale on
//! [`rebuild`](VectorIndexStore::rebuild), and embeds queries for
//! [`search`](VectorIndexStore::search). Re-ingestion replaces the index; it
//! never merges into it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::document::{Chunk, EmbeddedChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::lazy::LazySlot;
use crate::provider::ModelProvider;

/// Loads, rebuilds and searches the persisted [`VectorIndex`].
pub struct VectorIndexStore {
    dir: PathBuf,
    models: Arc<ModelProvider>,
    index: LazySlot<VectorIndex>,
}

impl VectorIndexStore {
    /// Create a store rooted at `dir`. Nothing is read until first use.
    pub fn new(dir: impl Into<PathBuf>, models: Arc<ModelProvider>) -> Self {
        Self { dir: dir.into(), models, index: LazySlot::new("vector_index") }
    }

    /// The loaded index, read from disk on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the index is missing or corrupt.
    pub async fn load(&self) -> Result<Arc<VectorIndex>> {
        self.index
            .get_or_try_init(|| async {
                info!(dir = %self.dir.display(), "loading vector index");
                let index = VectorIndex::open(&self.dir).await.map_err(|e| {
                    error!(dir = %self.dir.display(), error = %e, "failed to load vector index");
                    e
                })?;
                Ok(Arc::new(index))
            })
            .await
    }

    /// Embed `chunks`, persist them as the new index and cache it.
    ///
    /// Any existing index in the directory is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if model credentials are absent,
    /// and [`RagError::VectorStore`] if embedding or persisting fails.
    pub async fn rebuild(&self, chunks: Vec<Chunk>) -> Result<Arc<VectorIndex>> {
        info!(dir = %self.dir.display(), chunk_count = chunks.len(), "rebuilding vector index");
        let embeddings = self.models.embeddings().await?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embeddings.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during rebuild");
            RagError::vector_store("failed to create vector index", e.to_string())
        })?;
        if vectors.len() != chunks.len() {
            return Err(RagError::vector_store(
                "failed to create vector index",
                format!("{} chunks but {} embeddings", chunks.len(), vectors.len()),
            ));
        }

        let entries: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();
        let index = Arc::new(VectorIndex::new(embeddings.model_name(), entries)?);
        index.save(&self.dir).await?;
        self.index.set(Arc::clone(&index)).await;

        info!(
            chunk_count = index.len(),
            dimensions = index.manifest().dimensions,
            "vector index rebuilt"
        );
        Ok(index)
    }

    /// Return up to `k` chunks nearest to `query`, most similar first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the index cannot be loaded or the
    /// query cannot be embedded.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let index = self.load().await?;
        let embeddings = self.models.embeddings().await?;
        search_index(&index, embeddings.as_ref(), query, k).await
    }

    /// Drop the cached index without touching the directory.
    pub async fn reset(&self) {
        info!("resetting vector index handle");
        self.index.invalidate().await;
    }
}

/// Embed `query` and search `index` with it.
pub(crate) async fn search_index(
    index: &VectorIndex,
    embeddings: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
) -> Result<Vec<Chunk>> {
    if index.is_empty() {
        return Ok(Vec::new());
    }
    let vector = embeddings
        .embed_query(query)
        .await
        .map_err(|e| RagError::vector_store("failed to embed query", e.to_string()))?;
    Ok(index.search(&vector, k)?.into_iter().map(|(chunk, _)| chunk).collect())
}
