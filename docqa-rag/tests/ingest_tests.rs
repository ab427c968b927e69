//! End-to-end ingestion: file to stored records.

mod common;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{ObservedStore, ScriptedEmbedder, reconciler};
use docqa_rag::{
    FixedSizeChunker, IndexReconciler, IngestionPipeline, RagConfig, Stage, VectorStore,
};

fn pipeline(
    store: Arc<ObservedStore>,
    embedder: Arc<ScriptedEmbedder>,
    reconciler: Arc<IndexReconciler>,
) -> IngestionPipeline {
    IngestionPipeline::builder()
        .config(RagConfig::builder().embed_batch_size(2).build().unwrap())
        .embedding_provider(embedder)
        .vector_store(store)
        .reconciler(reconciler)
        .chunker(Arc::new(FixedSizeChunker::new(1000, 200)))
        .build()
        .unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn ingested_ids_match_the_chunk_count_and_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let path = write(dir.path(), "alphabet.txt", &text);

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(32);
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler(store.clone(), embedder));

    let report = pipeline.ingest_file(&path).await.unwrap();

    assert_eq!(report.chunk_count, report.document_ids.len());
    assert_eq!(report.chunk_count, 3);
    let unique: HashSet<_> = report.document_ids.iter().collect();
    assert_eq!(unique.len(), report.chunk_count);
    assert_eq!(report.document_ids[0], "alphabet.txt_0");
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.record_count("docs").await, 3);
}

#[tokio::test]
async fn empty_file_reports_nothing_and_never_touches_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "empty.md", "");

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(32);
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler(store.clone(), embedder));

    let report = pipeline.ingest_file(&path).await.unwrap();

    assert_eq!(report.chunk_count, 0);
    assert!(report.document_ids.is_empty());
    assert!(!store.has_collection("docs").await.unwrap());
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chunk_ids_longer_than_the_primary_key_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    // 255 bytes, the longest name most filesystems allow; `_0` pushes it over.
    let name = format!("{}.txt", "n".repeat(251));
    let path = write(dir.path(), &name, "some notes about vectors");

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(32);
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler(store.clone(), embedder));

    let err = pipeline.ingest_file(&path).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Split));
    assert!(err.is_input_error());
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_file_fails_in_the_load_stage() {
    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(32);
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler(store, embedder));

    let err = pipeline.ingest_file(Path::new("/definitely/not/here.txt")).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Load));
}

#[tokio::test]
async fn embedding_failure_names_the_stage_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "notes.md", "some notes about vectors");

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(32);
    let reconciler = reconciler(store.clone(), embedder.clone());
    reconciler.ensure_collection(Some(32)).await.unwrap();
    embedder.fail_with("quota exceeded");
    let pipeline = pipeline(store.clone(), embedder, reconciler);

    let err = pipeline.ingest_file(&path).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Embed));
    assert!(err.to_string().contains("quota exceeded"));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.inner.record_count("docs").await, 0);
}

#[tokio::test]
async fn vectors_of_the_wrong_width_are_rejected_before_indexing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "notes.md", "some notes about vectors");

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(16);
    let reconciler = reconciler(store.clone(), embedder.clone());
    reconciler.ensure_collection(Some(8)).await.unwrap();
    let pipeline = pipeline(store.clone(), embedder, reconciler);

    let err = pipeline.ingest_file(&path).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Embed));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_names_the_index_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "notes.md", "some notes about vectors");

    let store = ObservedStore::new();
    store.fail_upsert.store(true, Ordering::SeqCst);
    let embedder = ScriptedEmbedder::new(16);
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler(store.clone(), embedder));

    let err = pipeline.ingest_file(&path).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Index));
    assert!(err.to_string().contains("disk full"));
}

#[tokio::test(start_paused = true)]
async fn records_follow_a_width_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "guide.md", "vector search guide");

    let store = ObservedStore::new();
    let embedder = ScriptedEmbedder::new(768);
    let reconciler = reconciler(store.clone(), embedder.clone());
    let pipeline = pipeline(store.clone(), embedder.clone(), reconciler.clone());
    pipeline.ingest_file(&path).await.unwrap();

    embedder.set_dimensions(1536);
    reconciler.ensure_collection(None).await.unwrap();
    pipeline.ingest_file(&path).await.unwrap();

    assert_eq!(store.drops.load(Ordering::SeqCst), 1);
    assert_eq!(store.inner.dimensions("docs").await, Some(1536));
    let hits = store.search("docs", &vec![0.1; 1536], 5).await.unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn builder_requires_every_collaborator() {
    let err = IngestionPipeline::builder().config(RagConfig::default()).build().err().unwrap();
    assert!(err.is_config_error());
}
