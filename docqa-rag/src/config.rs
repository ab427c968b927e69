//! Configuration for the ingestion and retrieval pipelines.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default similarity threshold for the relevance gate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Default number of results returned by vector search.
pub const DEFAULT_TOP_K: usize = 10;

/// Configuration parameters for the RAG pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum best-match score needed to answer. Compared with `<`.
    pub similarity_threshold: f32,
    /// Number of chunk texts sent per embedding request.
    pub embed_batch_size: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embed_batch_size: 16,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the similarity threshold of the relevance gate.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set how many texts are embedded per request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `embed_batch_size == 0`
    /// - `similarity_threshold` is outside `[0, 1]`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.config.embed_batch_size == 0 {
            return Err(RagError::ConfigError(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.config.similarity_threshold) {
            return Err(RagError::ConfigError(format!(
                "similarity_threshold ({}) must be within [0, 1]",
                self.config.similarity_threshold
            )));
        }
        Ok(self.config)
    }
}

/// Settings for the collection managed by the index reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// The configured collection name.
    pub collection_name: String,
    /// Interval between existence checks after a drop.
    pub poll_interval: Duration,
    /// How long to wait for a dropped collection to disappear.
    pub drop_timeout: Duration,
}

impl ReconcilerConfig {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            poll_interval: Duration::from_millis(500),
            drop_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_drop_timeout(mut self, timeout: Duration) -> Self {
        self.drop_timeout = timeout;
        self
    }
}
