//! Data types for chunks, stored records, and search results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RagError, Result};

/// Metadata key holding the file-system path of the source document.
pub const META_URI: &str = "uri";
/// Metadata key holding the human-readable source name.
pub const META_SOURCE: &str = "source";
/// Metadata key holding the uploaded file name.
pub const META_FILE_NAME: &str = "file_name";
/// Metadata key holding the lower-cased file extension, including the dot.
pub const META_EXTENSION: &str = "extension";
/// Metadata key holding a split chunk's position in its parent.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding a split chunk's parent id.
pub const META_PARENT_ID: &str = "parent_id";
/// Metadata key holding a raw similarity score reported by a store.
pub const META_SCORE: &str = "score";
/// Metadata key holding a raw distance reported by a store.
pub const META_DISTANCE: &str = "distance";

/// A unit of text plus metadata produced from a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub content: String,
    /// Metadata inherited from the source document plus chunk-specific fields.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Map::new() }
    }

    /// Attach a metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The source path recorded by the loader, if any.
    pub fn uri(&self) -> Option<&str> {
        self.metadata.get(META_URI).and_then(Value::as_str)
    }
}

/// The persisted form of a [`Chunk`] inside a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Same as the chunk id.
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    /// JSON-serialized chunk metadata.
    pub metadata: Vec<u8>,
}

impl VectorRecord {
    /// Build a record from a chunk and its embedding.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Result<Self> {
        let metadata = serde_json::to_vec(&chunk.metadata).map_err(|e| {
            RagError::VectorStoreError {
                backend: "record".to_string(),
                message: format!("failed to serialize metadata of chunk '{}': {e}", chunk.id),
            }
        })?;
        Ok(Self { id: chunk.id.clone(), vector, content: chunk.content.clone(), metadata })
    }

    /// Decode the metadata bytes. Invalid or empty bytes yield an empty map.
    pub fn metadata_map(&self) -> Map<String, Value> {
        decode_metadata(&self.metadata)
    }
}

/// Decode JSON metadata bytes into a map, falling back to an empty map.
pub fn decode_metadata(bytes: &[u8]) -> Map<String, Value> {
    serde_json::from_slice::<Map<String, Value>>(bytes).unwrap_or_default()
}

/// Similarity metric used by a collection's vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    #[default]
    Cosine,
}

/// Schema of a collection: a fixed field layout with a per-collection width.
///
/// | Field | Type |
/// |-------|------|
/// | `id` | varchar(255), primary key |
/// | `vector` | float vector of `dimensions` |
/// | `content` | varchar(65535) |
/// | `metadata` | JSON |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub dimensions: usize,
    pub metric: Metric,
}

impl CollectionSchema {
    pub const ID_FIELD: &'static str = "id";
    pub const VECTOR_FIELD: &'static str = "vector";
    pub const CONTENT_FIELD: &'static str = "content";
    pub const METADATA_FIELD: &'static str = "metadata";
    pub const ID_MAX_LENGTH: usize = 255;
    pub const CONTENT_MAX_LENGTH: usize = 65535;

    pub fn new(name: impl Into<String>, dimensions: usize) -> Self {
        Self { name: name.into(), dimensions, metric: Metric::Cosine }
    }
}

/// A raw hit returned by a vector store.
///
/// Stores differ in where they report similarity: some fill `score`
/// directly, others leave it to `metadata.score` or `metadata.distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: Option<f32>,
}

/// A retrieved passage with a normalized score (higher is more similar).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}
