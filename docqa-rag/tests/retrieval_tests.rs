//! Retrieval ranking, score normalization and the similarity gate.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{ObservedStore, ScriptedEmbedder, hit, reconciler};
use docqa_rag::{
    FixedSizeChunker, IngestionPipeline, RagConfig, Retriever, ScoredRecord, Stage, VectorStore,
};
use serde_json::{Map, Value};

/// A retriever over a collection that has already been reconciled.
async fn retriever(store: Arc<ObservedStore>, embedder: Arc<ScriptedEmbedder>, threshold: f32) -> Retriever {
    let reconciler = reconciler(store.clone(), embedder.clone());
    reconciler.ensure_collection(None).await.unwrap();
    Retriever::new(embedder, store, reconciler, threshold)
}

#[tokio::test]
async fn best_score_equal_to_the_threshold_passes() {
    let store = ObservedStore::new();
    store.set_hits(vec![hit("a", 0.7), hit("b", 0.2)]);
    let retriever = retriever(store, ScriptedEmbedder::new(8), 0.7).await;

    let retrieval = retriever.retrieve("question", 10).await.unwrap();

    assert_eq!(retrieval.max_score, 0.7);
    assert!(!retrieval.below_threshold);
}

#[tokio::test]
async fn best_score_just_under_the_threshold_is_gated() {
    let store = ObservedStore::new();
    store.set_hits(vec![hit("a", 0.6999)]);
    let retriever = retriever(store, ScriptedEmbedder::new(8), 0.7).await;

    let retrieval = retriever.retrieve("question", 10).await.unwrap();

    assert!(retrieval.below_threshold);
    assert_eq!(retrieval.documents.len(), 1);
}

#[tokio::test]
async fn empty_collection_is_below_threshold_not_an_error() {
    let retriever = retriever(ObservedStore::new(), ScriptedEmbedder::new(8), 0.7).await;

    let retrieval = retriever.retrieve("anything at all", 10).await.unwrap();

    assert!(retrieval.documents.is_empty());
    assert_eq!(retrieval.max_score, 0.0);
    assert!(retrieval.below_threshold);
}

#[tokio::test]
async fn blank_query_is_rejected_before_embedding() {
    let embedder = ScriptedEmbedder::new(8);
    let retriever = retriever(ObservedStore::new(), embedder.clone(), 0.7).await;
    let calls_before = embedder.calls.load(Ordering::SeqCst);

    let err = retriever.retrieve("   ", 10).await.unwrap_err();

    assert!(err.is_input_error());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn distances_are_converted_to_similarities() {
    let mut metadata = Map::new();
    metadata.insert("distance".into(), Value::from(0.1));
    let store = ObservedStore::new();
    store.set_hits(vec![ScoredRecord {
        id: "a".into(),
        content: "text".into(),
        metadata,
        score: None,
    }]);
    let retriever = retriever(store, ScriptedEmbedder::new(8), 0.7).await;

    let retrieval = retriever.retrieve("question", 10).await.unwrap();

    assert!((retrieval.max_score - 0.9).abs() < 1e-6);
    assert!(!retrieval.below_threshold);
}

#[tokio::test]
async fn embedding_failure_names_the_retrieve_stage() {
    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(8);
    let retriever = retriever(store, embedder.clone(), 0.7).await;
    embedder.fail_with("timeout");

    let err = retriever.retrieve("question", 10).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Retrieve));
}

#[tokio::test]
async fn the_nearest_chunk_ranks_first() {
    let dir = tempfile::tempdir().unwrap();
    let paragraphs = [
        "Milvus stores embeddings in collections with a fixed vector width.",
        "Chunk overlap keeps sentences from being cut in half between windows.",
        "Streaming answers send a start event, data events and one end event.",
    ];
    for (i, text) in paragraphs.iter().enumerate() {
        std::fs::write(dir.path().join(format!("p{i}.txt")), text).unwrap();
    }

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(128);
    let reconciler = reconciler(store.clone(), embedder.clone());
    let pipeline = IngestionPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .reconciler(reconciler.clone())
        .chunker(Arc::new(FixedSizeChunker::default()))
        .build()
        .unwrap();
    for i in 0..paragraphs.len() {
        pipeline.ingest_file(&dir.path().join(format!("p{i}.txt"))).await.unwrap();
    }

    let retriever = Retriever::new(embedder, store, reconciler, 0.7);
    let retrieval = retriever.retrieve(paragraphs[1], 3).await.unwrap();

    assert_eq!(retrieval.documents[0].id, "p1.txt_0");
    assert!((retrieval.documents[0].score - 1.0).abs() < 1e-5);
    assert!(!retrieval.below_threshold);
    for pair in retrieval.documents.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn query_after_admin_drop_leaves_the_collection_absent() {
    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(8);
    let reconciler = reconciler(store.clone(), embedder.clone());
    reconciler.ensure_collection(None).await.unwrap();
    reconciler.drop_collection("docs").await.unwrap();

    let retriever = Retriever::new(embedder, store.clone(), reconciler.clone(), 0.7);
    let retrieval = retriever.retrieve("hello", 5).await.unwrap();

    assert!(retrieval.documents.is_empty());
    assert!(retrieval.below_threshold);
    assert!(!store.has_collection("docs").await.unwrap());
    assert!(reconciler.active_collection().await.is_none());
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_before_any_ingestion_does_not_create_the_collection() {
    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(8);
    let reconciler = reconciler(store.clone(), embedder.clone());
    let retriever = Retriever::new(embedder.clone(), store.clone(), reconciler, 0.7);

    let retrieval = retriever.retrieve("hello", 5).await.unwrap();

    assert!(retrieval.below_threshold);
    assert_eq!(store.creates.load(Ordering::SeqCst), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}
