//! Corpus ingestion: discover files, split them, rebuild the index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::chunking::{Chunker, RecursiveCharacterSplitter};
use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};
use crate::provider::ModelProvider;
use crate::store::VectorIndexStore;

/// List the files under `root` whose extension is one of `extensions`.
///
/// Extensions are compared case-insensitively and without the leading dot.
/// `root` may also name a single file. The result is sorted by path.
///
/// # Errors
///
/// Returns [`RagError::Ingest`] if `root` does not exist or cannot be walked.
pub fn discover_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(RagError::ingest("corpus path not found", root.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| RagError::ingest("failed to scan corpus", e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let eligible = entry.path().extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
            extensions.iter().any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        });
        if eligible {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Builds the vector index from a directory of text files.
pub struct IngestPipeline {
    extensions: Vec<String>,
    splitter: RecursiveCharacterSplitter,
    store: Arc<VectorIndexStore>,
    models: Arc<ModelProvider>,
}

impl IngestPipeline {
    /// Create a pipeline writing into `store`.
    pub fn new(
        config: &RagConfig,
        store: Arc<VectorIndexStore>,
        models: Arc<ModelProvider>,
    ) -> Self {
        Self {
            extensions: config.paths.file_extensions.clone(),
            splitter: RecursiveCharacterSplitter::from_config(&config.chunk),
            store,
            models,
        }
    }

    /// Load, split and embed every eligible file under `corpus`, replacing
    /// the persisted index. Returns the number of chunks indexed.
    ///
    /// # Errors
    ///
    /// - [`RagError::Configuration`] if model credentials are absent
    /// - [`RagError::Ingest`] if no eligible file is found, a file cannot be
    ///   read as UTF-8 text, or the corpus yields no chunks
    /// - [`RagError::VectorStore`] if embedding or persisting fails
    pub async fn ingest(&self, corpus: &Path) -> Result<usize> {
        info!(path = %corpus.display(), "starting ingestion");
        self.models.embeddings().await.inspect_err(|e| {
            error!(error = %e, "model configuration unavailable");
        })?;

        let documents = self.load_documents(corpus).await?;
        let chunks: Vec<Chunk> =
            documents.iter().flat_map(|doc| self.splitter.chunk(doc)).collect();
        if chunks.is_empty() {
            let err = RagError::ingest("corpus produced no chunks", corpus.display().to_string());
            error!(error = %err, "ingestion failed");
            return Err(err);
        }
        info!(documents = documents.len(), chunks = chunks.len(), "corpus split");

        let index = self.store.rebuild(chunks).await?;
        info!(chunks = index.len(), "ingestion complete");
        Ok(index.len())
    }

    /// Read every eligible file under `corpus` as a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Ingest`] if no file is eligible or a file cannot
    /// be read.
    pub async fn load_documents(&self, corpus: &Path) -> Result<Vec<Document>> {
        let files = discover_files(corpus, &self.extensions).inspect_err(|e| {
            error!(error = %e, "corpus discovery failed");
        })?;
        if files.is_empty() {
            let err = RagError::ingest(
                "no eligible files found",
                format!("{} (extensions: {})", corpus.display(), self.extensions.join(", ")),
            );
            error!(error = %err, "ingestion failed");
            return Err(err);
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                error!(path = %path.display(), error = %e, "failed to read file");
                RagError::ingest(format!("failed to load {}", path.display()), e.to_string())
            })?;
            debug!(path = %path.display(), chars = text.chars().count(), "loaded document");
            documents.push(Document::from_source(path.display().to_string(), text));
        }

        info!(documents = documents.len(), "documents loaded");
        Ok(documents)
    }
}
