//! Vector store trait for schema-bound collections of vector records.

use async_trait::async_trait;

use crate::document::{CollectionSchema, ScoredRecord, VectorRecord};
use crate::error::Result;

/// A storage backend for vector records with similarity search.
///
/// Implementations manage named collections whose vector width is fixed at
/// creation. Creating a collection that already exists with a different
/// width must fail with [`RagError::SchemaMismatch`](crate::RagError::SchemaMismatch)
/// so the index reconciler can rebuild it.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{CollectionSchema, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection(&CollectionSchema::new("docs", 384)).await?;
/// store.upsert("docs", &records).await?;
/// let hits = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// A short label used in logs and errors.
    fn name(&self) -> &str;

    /// Whether a collection with this name exists.
    async fn has_collection(&self, name: &str) -> Result<bool>;

    /// Create the collection, or open it if it exists with the same width.
    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()>;

    /// Unload a collection from serving memory. Backends without a notion of
    /// loading can rely on the default no-op.
    async fn release_collection(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Delete a collection and all its data. Dropping a missing collection is not an error.
    async fn drop_collection(&self, name: &str) -> Result<()>;

    /// Names of all collections.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Write records into a collection, replacing records with equal ids.
    ///
    /// Returns the ids written, in input order.
    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<Vec<String>>;

    /// Search for the `top_k` most similar records to the given vector.
    ///
    /// Returns hits ordered by descending similarity.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>>;
}
