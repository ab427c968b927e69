use std::path::PathBuf;
use std::sync::Arc;

use docqa_model::ChatModel;
use docqa_rag::{
    AnswerSynthesizer, Chunker, EmbeddingProvider, IndexReconciler, IngestionPipeline, RagConfig,
    ReconcilerConfig, Retriever, VectorStore,
};

use crate::error::Result;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handles for every request. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub answers: Arc<AnswerSynthesizer>,
    pub reconciler: Arc<IndexReconciler>,
    pub vector_store: Arc<dyn VectorStore>,
    pub chat_model: Option<Arc<dyn ChatModel>>,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire the pipelines around already-built capabilities.
    pub fn assemble(
        rag: RagConfig,
        reconciler_config: ReconcilerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        chunker: Arc<dyn Chunker>,
        chat_model: Option<Arc<dyn ChatModel>>,
    ) -> Result<Self> {
        let reconciler =
            Arc::new(IndexReconciler::new(vector_store.clone(), embedder.clone(), reconciler_config));

        let retriever = Arc::new(Retriever::new(
            embedder.clone(),
            vector_store.clone(),
            reconciler.clone(),
            rag.similarity_threshold,
        ));
        let answers = Arc::new(AnswerSynthesizer::new(retriever, chat_model.clone(), rag.top_k));

        let pipeline = IngestionPipeline::builder()
            .config(rag)
            .embedding_provider(embedder)
            .vector_store(vector_store.clone())
            .reconciler(reconciler.clone())
            .chunker(chunker)
            .build()?;

        Ok(Self {
            pipeline: Arc::new(pipeline),
            answers,
            reconciler,
            vector_store,
            chat_model,
            upload_dir: std::env::temp_dir().join("docqa-uploads"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
