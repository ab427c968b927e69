//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{
    CollectionSchema, EmbeddingProvider, HashEmbeddingProvider, InMemoryVectorStore,
    IndexReconciler, RagError, ReconcilerConfig, Result, ScoredRecord, VectorRecord, VectorStore,
};

/// Hash embeddings whose width can be changed mid-test.
pub struct ScriptedEmbedder {
    dims: AtomicUsize,
    failure: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new(dims: usize) -> Arc<Self> {
        Arc::new(Self { dims: AtomicUsize::new(dims), failure: Mutex::new(None), calls: AtomicUsize::new(0) })
    }

    pub fn set_dimensions(&self, dims: usize) {
        self.dims.store(dims, Ordering::SeqCst);
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedEmbedder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.failure.lock().unwrap().clone();
        if let Some(message) = failure {
            return Err(RagError::EmbeddingError { provider: "scripted".into(), message });
        }
        let dims = self.dims.load(Ordering::SeqCst);
        if dims == 0 {
            return Ok(Vec::new());
        }
        HashEmbeddingProvider::new(dims).embed(text).await
    }
}

/// An in-memory store that counts calls and can misbehave on request.
#[derive(Default)]
pub struct ObservedStore {
    pub inner: InMemoryVectorStore,
    pub creates: AtomicUsize,
    pub drops: AtomicUsize,
    pub releases: AtomicUsize,
    pub upserts: AtomicUsize,
    /// Keep reporting dropped collections as present.
    pub linger_after_drop: AtomicBool,
    pub fail_upsert: AtomicBool,
    dropped: Mutex<HashSet<String>>,
    canned_hits: Mutex<Option<Vec<ScoredRecord>>>,
}

impl ObservedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every search return these hits.
    pub fn set_hits(&self, hits: Vec<ScoredRecord>) {
        *self.canned_hits.lock().unwrap() = Some(hits);
    }
}

#[async_trait]
impl VectorStore for ObservedStore {
    fn name(&self) -> &str {
        "observed"
    }

    async fn has_collection(&self, name: &str) -> Result<bool> {
        let lingering = self.linger_after_drop.load(Ordering::SeqCst)
            && self.dropped.lock().unwrap().contains(name);
        if lingering {
            return Ok(true);
        }
        self.inner.has_collection(name).await
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(schema).await
    }

    async fn release_collection(&self, name: &str) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> Result<()> {
        self.drops.fetch_add(1, Ordering::SeqCst);
        {
            self.dropped.lock().unwrap().insert(name.to_string());
        }
        self.inner.drop_collection(name).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn upsert(&self, collection: &str, records: &[VectorRecord]) -> Result<Vec<String>> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(RagError::VectorStoreError {
                backend: "observed".into(),
                message: "disk full".into(),
            });
        }
        self.inner.upsert(collection, records).await
    }

    async fn search(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let canned = self.canned_hits.lock().unwrap().clone();
        if let Some(hits) = canned {
            return Ok(hits.into_iter().take(top_k).collect());
        }
        self.inner.search(collection, vector, top_k).await
    }
}

pub fn reconciler(store: Arc<ObservedStore>, embedder: Arc<ScriptedEmbedder>) -> Arc<IndexReconciler> {
    let config = ReconcilerConfig::new("docs")
        .with_poll_interval(Duration::from_millis(500))
        .with_drop_timeout(Duration::from_secs(15));
    Arc::new(IndexReconciler::new(store, embedder, config))
}

pub fn hit(id: &str, score: f32) -> ScoredRecord {
    ScoredRecord { id: id.into(), content: format!("content of {id}"), metadata: Default::default(), score: Some(score) }
}
