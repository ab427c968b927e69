//! Retrieval with score normalization and a similarity gate.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::document::{META_DISTANCE, META_SCORE, RetrievedDocument, ScoredRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result, Stage};
use crate::ingest::preview;
use crate::reconciler::IndexReconciler;
use crate::vectorstore::VectorStore;

/// Ranked passages plus the gate decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    /// Passages in the store's ranking order.
    pub documents: Vec<RetrievedDocument>,
    /// Best normalized score, 0 when nothing was found.
    pub max_score: f32,
    /// `max_score < threshold`. Always true when nothing was found.
    pub below_threshold: bool,
}

/// Normalize a raw hit to a similarity where higher is better.
///
/// Uses the direct score when the store reported one, then
/// `metadata.score`, then `1 - metadata.distance`, and 0 otherwise. The raw
/// values used are written back to `metadata.score` and `metadata.distance`.
pub fn normalize_score(record: ScoredRecord) -> RetrievedDocument {
    let ScoredRecord { id, content, mut metadata, score } = record;
    let meta_score = metadata.get(META_SCORE).and_then(Value::as_f64).map(|s| s as f32);
    let meta_distance = metadata.get(META_DISTANCE).and_then(Value::as_f64).map(|d| d as f32);

    let normalized = score
        .or(meta_score)
        .or_else(|| meta_distance.map(|d| 1.0 - d))
        .unwrap_or(0.0);

    if let Some(raw) = score.or(meta_score) {
        metadata.insert(META_SCORE.to_string(), Value::from(raw));
    }
    if let Some(distance) = meta_distance {
        metadata.insert(META_DISTANCE.to_string(), Value::from(distance));
    }

    RetrievedDocument { id, content, score: normalized, metadata }
}

/// Embeds a query, searches the active collection and applies the gate.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    reconciler: Arc<IndexReconciler>,
    similarity_threshold: f32,
}

impl Retriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        reconciler: Arc<IndexReconciler>,
        similarity_threshold: f32,
    ) -> Self {
        Self { embedding_provider, vector_store, reconciler, similarity_threshold }
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Retrieve up to `top_k` passages for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InputError`] for a blank query, and a
    /// [`Stage::Retrieve`] error when embedding or search fails. A collection
    /// that does not exist yields an empty, gated result.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Retrieval> {
        if query.trim().is_empty() {
            return Err(RagError::InputError("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InputError("top_k must be greater than zero".to_string()));
        }

        // Queries never reconcile. Before the first ingestion, or after an
        // admin drop, a missing collection simply has no candidates.
        let collection = match self.reconciler.active_collection().await {
            Some(active) => active.name,
            None => {
                let name = self.reconciler.configured_name().to_string();
                let exists = self.vector_store.has_collection(&name).await.map_err(|e| {
                    error!(collection = %name, error = %e, "failed to look up collection");
                    e.in_stage(Stage::Retrieve)
                })?;
                if !exists {
                    info!(collection = %name, "collection absent, nothing to retrieve");
                    return Ok(Retrieval { documents: Vec::new(), max_score: 0.0, below_threshold: true });
                }
                name
            }
        };

        let embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e.in_stage(Stage::Retrieve)
        })?;

        let hits = self
            .vector_store
            .search(&collection, &embedding, top_k)
            .await
            .map_err(|e| {
                error!(collection = %collection, error = %e, "vector store search failed");
                e.in_stage(Stage::Retrieve)
            })?;

        let documents: Vec<RetrievedDocument> = hits.into_iter().map(normalize_score).collect();
        for (i, doc) in documents.iter().enumerate() {
            debug!(rank = i, id = %doc.id, score = doc.score, preview = %preview(&doc.content), "retrieved passage");
        }

        let max_score = documents.iter().map(|d| d.score).fold(0.0f32, f32::max);
        let below_threshold = documents.is_empty() || max_score < self.similarity_threshold;

        info!(
            collection = %collection,
            result_count = documents.len(),
            max_score,
            threshold = self.similarity_threshold,
            below_threshold,
            "query completed"
        );

        Ok(Retrieval { documents, max_score, below_threshold })
    }
}
