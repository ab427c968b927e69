//! Milvus vector store backend.
//!
//! Provides [`MilvusVectorStore`] which implements [`VectorStore`] over the
//! Milvus RESTful API (v2) using `reqwest`. Collections use the fixed field
//! layout described on [`CollectionSchema`] with a COSINE vector index.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::milvus::MilvusVectorStore;
//!
//! let store = MilvusVectorStore::new("http://localhost:19530")?.with_credentials("root", "Milvus");
//! store.create_collection(&CollectionSchema::new("documents", 1024)).await?;
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::document::{CollectionSchema, ScoredRecord, VectorRecord, decode_metadata};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "milvus";

/// A [`VectorStore`] backed by [Milvus](https://milvus.io/).
///
/// Milvus reports COSINE similarity in the `distance` field of search hits;
/// the adapter passes it through as a direct score.
pub struct MilvusVectorStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MilvusVectorStore {
    /// Create a store for the given address. A missing scheme defaults to `http://`.
    pub fn new(addr: &str) -> Result<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(RagError::ConfigError("Milvus address must not be empty".to_string()));
        }
        let base_url = if addr.contains("://") { addr.to_string() } else { format!("http://{addr}") };
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Authenticate with a username and password. Empty usernames are ignored.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        if !username.is_empty() {
            self.token = Some(format!("{username}:{password}"));
        }
        self
    }

    fn map_err(message: impl Into<String>) -> RagError {
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: message.into() }
    }

    /// POST to a v2 endpoint and unwrap the `{code, data, message}` envelope.
    async fn call<T: DeserializeOwned + Default>(&self, path: &str, body: Value) -> Result<T> {
        let url = format!("{}/v2/vectordb/{path}", self.base_url);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(endpoint = path, error = %e, "milvus request failed");
            Self::map_err(format!("{path}: request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(endpoint = path, %status, "milvus returned HTTP error");
            return Err(Self::map_err(format!("{path}: HTTP {status}: {body}")));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            error!(endpoint = path, error = %e, "failed to parse milvus response");
            Self::map_err(format!("{path}: failed to parse response: {e}"))
        })?;

        if envelope.code != 0 {
            let message = envelope.message.unwrap_or_default();
            error!(endpoint = path, code = envelope.code, message = %message, "milvus error");
            return Err(Self::map_err(format!("{path}: code {}: {message}", envelope.code)));
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// The vector width of an existing collection.
    async fn describe_dimensions(&self, name: &str) -> Result<usize> {
        let described: Described =
            self.call("collections/describe", json!({ "collectionName": name })).await?;
        described
            .fields
            .iter()
            .find(|f| f.name == CollectionSchema::VECTOR_FIELD)
            .and_then(|f| f.params.iter().find(|p| p.key == "dim"))
            .and_then(|p| match &p.value {
                Value::String(s) => s.parse().ok(),
                Value::Number(n) => n.as_u64().map(|n| n as usize),
                _ => None,
            })
            .ok_or_else(|| Self::map_err(format!("collection '{name}' has no vector dimension")))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Deserialize, Default)]
struct HasData {
    #[serde(default)]
    has: bool,
}

#[derive(Deserialize, Default)]
struct Described {
    #[serde(default)]
    fields: Vec<DescribedField>,
}

#[derive(Deserialize)]
struct DescribedField {
    name: String,
    #[serde(default)]
    params: Vec<FieldParam>,
}

#[derive(Deserialize)]
struct FieldParam {
    key: String,
    value: Value,
}

#[derive(Deserialize, Default)]
struct UpsertData {
    #[serde(default, rename = "upsertIds")]
    upsert_ids: Vec<Value>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: Value,
    #[serde(default)]
    distance: Option<f32>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    metadata: Value,
}

/// Request body creating a collection with the fixed field layout.
fn create_body(schema: &CollectionSchema) -> Value {
    json!({
        "collectionName": schema.name,
        "schema": {
            "autoId": false,
            "enableDynamicField": false,
            "fields": [
                {
                    "fieldName": CollectionSchema::ID_FIELD,
                    "dataType": "VarChar",
                    "isPrimary": true,
                    "elementTypeParams": { "max_length": CollectionSchema::ID_MAX_LENGTH }
                },
                {
                    "fieldName": CollectionSchema::VECTOR_FIELD,
                    "dataType": "FloatVector",
                    "elementTypeParams": { "dim": schema.dimensions }
                },
                {
                    "fieldName": CollectionSchema::CONTENT_FIELD,
                    "dataType": "VarChar",
                    "elementTypeParams": { "max_length": CollectionSchema::CONTENT_MAX_LENGTH }
                },
                { "fieldName": CollectionSchema::METADATA_FIELD, "dataType": "JSON" }
            ]
        },
        "indexParams": [{
            "fieldName": CollectionSchema::VECTOR_FIELD,
            "indexName": CollectionSchema::VECTOR_FIELD,
            "metricType": "COSINE",
            "indexType": "AUTOINDEX"
        }]
    })
}

/// Metadata comes back either as a JSON object or as its serialized text.
fn metadata_value(raw: Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        Value::String(text) => decode_metadata(text.as_bytes()),
        _ => Map::new(),
    }
}

fn id_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorStore for MilvusVectorStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        let data: HasData = self.call("collections/has", json!({ "collectionName": name })).await?;
        Ok(data.has)
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        if self.has_collection(&schema.name).await? {
            let actual = self.describe_dimensions(&schema.name).await?;
            if actual != schema.dimensions {
                return Err(RagError::SchemaMismatch {
                    collection: schema.name.clone(),
                    expected: schema.dimensions,
                    actual,
                });
            }
            debug!(collection = %schema.name, "milvus collection exists, loading");
            let _: Value =
                self.call("collections/load", json!({ "collectionName": schema.name })).await?;
            return Ok(());
        }

        debug!(collection = %schema.name, dimensions = schema.dimensions, "creating milvus collection");
        let _: Value = self.call("collections/create", create_body(schema)).await?;
        Ok(())
    }

    async fn release_collection(&self, name: &str) -> Result<()> {
        let _: Value = self.call("collections/release", json!({ "collectionName": name })).await?;
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        let _: Value = self.call("collections/drop", json!({ "collectionName": name })).await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.call("collections/list", json!({})).await
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let data: Vec<Value> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "vector": r.vector,
                    "content": r.content,
                    "metadata": Value::Object(r.metadata_map()),
                })
            })
            .collect();

        debug!(collection, count = records.len(), "upserting records to milvus");
        let result: UpsertData = self
            .call("entities/upsert", json!({ "collectionName": collection, "data": data }))
            .await?;

        if result.upsert_ids.is_empty() {
            return Ok(records.iter().map(|r| r.id.clone()).collect());
        }
        Ok(result.upsert_ids.into_iter().map(id_string).collect())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let body = json!({
            "collectionName": collection,
            "data": [vector],
            "annsField": CollectionSchema::VECTOR_FIELD,
            "limit": top_k,
            "outputFields": [
                CollectionSchema::ID_FIELD,
                CollectionSchema::CONTENT_FIELD,
                CollectionSchema::METADATA_FIELD
            ],
            "searchParams": { "metricType": "COSINE" }
        });

        let hits: Vec<SearchHit> = self.call("entities/search", body).await?;
        debug!(collection, hits = hits.len(), "milvus search completed");

        Ok(hits
            .into_iter()
            .map(|hit| ScoredRecord {
                id: id_string(hit.id),
                content: hit.content,
                metadata: metadata_value(hit.metadata),
                score: hit.distance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_without_scheme_defaults_to_http() {
        let store = MilvusVectorStore::new("localhost:19530").unwrap();
        assert_eq!(store.base_url, "http://localhost:19530");
        assert!(MilvusVectorStore::new("  ").is_err());
    }

    #[test]
    fn credentials_become_a_bearer_token() {
        let store = MilvusVectorStore::new("http://m:19530").unwrap().with_credentials("root", "pw");
        assert_eq!(store.token.as_deref(), Some("root:pw"));
        let anonymous = MilvusVectorStore::new("http://m:19530").unwrap().with_credentials("", "");
        assert!(anonymous.token.is_none());
    }

    #[test]
    fn create_body_uses_fixed_layout() {
        let body = create_body(&CollectionSchema::new("documents", 768));
        let fields = body["schema"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0]["fieldName"], "id");
        assert_eq!(fields[0]["isPrimary"], true);
        assert_eq!(fields[1]["elementTypeParams"]["dim"], 768);
        assert_eq!(fields[2]["elementTypeParams"]["max_length"], 65535);
        assert_eq!(body["indexParams"][0]["metricType"], "COSINE");
    }

    #[test]
    fn metadata_accepts_objects_and_serialized_text() {
        let from_text = metadata_value(Value::from(r#"{"source":"a.md"}"#));
        assert_eq!(from_text.get("source"), Some(&Value::from("a.md")));
        assert!(metadata_value(Value::Null).is_empty());
    }
}
