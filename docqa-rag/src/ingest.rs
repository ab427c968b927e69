//! Ingestion pipeline: file to searchable vector records.
//!
//! [`IngestionPipeline::ingest_file`] runs six stages in order, each
//! consuming the full output of the previous one:
//!
//! 1. load the file into one preliminary chunk
//! 2. parse it by extension
//! 3. split it into overlapping chunks
//! 4. reconcile the target collection
//! 5. embed the chunks in batches
//! 6. index all records with one upsert
//!
//! Nothing is written before stage 6, so a failure anywhere leaves the
//! collection untouched. Errors carry the stage they came from.
//!
//! # Example
//!
//! ```rust,ignore
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(embedder)
//!     .vector_store(store)
//!     .reconciler(reconciler)
//!     .chunker(Arc::new(FixedSizeChunker::new(1000, 200)))
//!     .build()?;
//!
//! let report = pipeline.ingest_file(Path::new("guide.md")).await?;
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Chunk, CollectionSchema, VectorRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::intake::{ExtParser, FileLoader};
use crate::reconciler::IndexReconciler;
use crate::vectorstore::VectorStore;

/// Characters of chunk content shown in debug logs.
pub(crate) const PREVIEW_CHARS: usize = 200;

pub(crate) fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Result of ingesting one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Ids of the stored records, in chunk order.
    pub document_ids: Vec<String>,
    /// Always equal to `document_ids.len()`.
    pub chunk_count: usize,
}

/// The ingestion pipeline. Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reconciler: Arc<IndexReconciler>,
    chunker: Arc<dyn Chunker>,
    loader: FileLoader,
    parser: ExtParser,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest one file: load, parse, split, reconcile, embed, index.
    ///
    /// An empty file yields an empty report without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Stage`] naming the stage that failed.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let loaded = self.loader.load(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to load file");
            e.in_stage(Stage::Load)
        })?;
        let document_id = loaded.id.clone();

        let parsed = self.parser.parse(loaded).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "failed to parse document");
            e.in_stage(Stage::Parse)
        })?;

        let chunks = self.split(&parsed).map_err(|e| e.in_stage(Stage::Split))?;
        if chunks.is_empty() {
            info!(document.id = %document_id, chunk_count = 0, "ingested document (empty)");
            return Ok(IngestReport::default());
        }

        let collection = self.reconciler.active_or_ensure().await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "failed to reconcile collection");
            e.in_stage(Stage::Reconcile)
        })?;

        let vectors = self.embed(&chunks, collection.dimensions).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "embedding failed during ingestion");
            e.in_stage(Stage::Embed)
        })?;

        let records = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorRecord::from_chunk(chunk, vector))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.in_stage(Stage::Index))?;

        let document_ids =
            self.vector_store.upsert(&collection.name, &records).await.map_err(|e| {
                error!(document.id = %document_id, collection = %collection.name, error = %e, "upsert failed during ingestion");
                e.in_stage(Stage::Index)
            })?;

        let chunk_count = document_ids.len();
        info!(document.id = %document_id, collection = %collection.name, chunk_count, "ingested document");
        Ok(IngestReport { document_ids, chunk_count })
    }

    fn split(&self, parsed: &Chunk) -> Result<Vec<Chunk>> {
        let chunks = self.chunker.split(parsed);
        let mut seen = HashSet::with_capacity(chunks.len());
        for chunk in &chunks {
            if !seen.insert(chunk.id.as_str()) {
                return Err(RagError::ChunkingError(format!("duplicate chunk id '{}'", chunk.id)));
            }
            if chunk.id.len() > CollectionSchema::ID_MAX_LENGTH {
                return Err(RagError::InputError(format!(
                    "chunk id is {} bytes, the limit is {}; use a shorter file name",
                    chunk.id.len(),
                    CollectionSchema::ID_MAX_LENGTH
                )));
            }
            debug!(chunk.id = %chunk.id, preview = %preview(&chunk.content), "split chunk");
        }
        Ok(chunks)
    }

    async fn embed(&self, chunks: &[Chunk], dimensions: usize) -> Result<Vec<Vec<f32>>> {
        let provider = self.embedding_provider.name().to_string();
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embedded = self.embedding_provider.embed_batch(&texts).await?;
            if embedded.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider,
                    message: format!("expected {} vectors, got {}", batch.len(), embedded.len()),
                });
            }
            vectors.extend(embedded);
        }

        if let Some((i, bad)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(RagError::EmbeddingError {
                provider,
                message: format!(
                    "vector for chunk '{}' has {} dimensions, collection expects {dimensions}",
                    chunks[i].id,
                    bad.len()
                ),
            });
        }
        Ok(vectors)
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// All fields are required.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reconciler: Option<Arc<IndexReconciler>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the reconciler owning the target collection.
    pub fn reconciler(mut self, reconciler: Arc<IndexReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`], validating that all fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any field is missing.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let reconciler = self
            .reconciler
            .ok_or_else(|| RagError::ConfigError("reconciler is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;

        Ok(IngestionPipeline {
            config,
            embedding_provider,
            vector_store,
            reconciler,
            chunker,
            loader: FileLoader::new(),
            parser: ExtParser::new(),
        })
    }
}
