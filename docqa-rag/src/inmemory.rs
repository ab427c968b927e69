//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps collections in a `HashMap` behind a
//! `tokio::sync::RwLock`. It enforces the same width rules as a real backend,
//! which makes it suitable for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{CollectionSchema, ScoredRecord, VectorRecord};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    records: HashMap<String, VectorRecord>,
    /// First-insertion order of ids, so equal scores rank deterministically.
    order: Vec<String>,
}

impl Collection {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, records: HashMap::new(), order: Vec::new() }
    }

    fn in_order(&self) -> impl Iterator<Item = &VectorRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

/// An in-memory vector store using cosine similarity for search.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{CollectionSchema, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection(&CollectionSchema::new("docs", 384)).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The vector width of a collection, if it exists.
    pub async fn dimensions(&self, name: &str) -> Option<usize> {
        self.collections.read().await.get(name).map(|c| c.dimensions)
    }

    /// Number of records stored in a collection (0 if missing).
    pub async fn record_count(&self, name: &str) -> usize {
        self.collections.read().await.get(name).map_or(0, |c| c.records.len())
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
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

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(&schema.name) {
            Some(existing) if existing.dimensions != schema.dimensions => {
                Err(RagError::SchemaMismatch {
                    collection: schema.name.clone(),
                    expected: schema.dimensions,
                    actual: existing.dimensions,
                })
            }
            Some(_) => Ok(()),
            None => {
                collections.insert(schema.name.clone(), Collection::new(schema.dimensions));
                Ok(())
            }
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<Vec<String>> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        // Validate the whole batch before touching the collection.
        if let Some(bad) = records.iter().find(|r| r.vector.len() != store.dimensions) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "record '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.id,
                    bad.vector.len(),
                    store.dimensions
                ),
            });
        }

        for record in records {
            if store.records.insert(record.id.clone(), record.clone()).is_none() {
                store.order.push(record.id.clone());
            }
        }
        Ok(records.iter().map(|r| r.id.clone()).collect())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut scored: Vec<ScoredRecord> = store
            .in_order()
            .map(|record| ScoredRecord {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata_map(),
                score: Some(cosine_similarity(&record.vector, vector)),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score.unwrap_or(0.0).partial_cmp(&a.score.unwrap_or(0.0)).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
