//! # docqa-rag
//!
//! Ingestion, index reconciliation and grounded retrieval for docqa.
//!
//! ## Overview
//!
//! - [`IngestionPipeline`] turns an uploaded file into vector records:
//!   load, parse, split, reconcile, embed, index.
//! - [`IndexReconciler`] keeps the target collection's vector width in step
//!   with the embedding provider, rebuilding (or renaming) on a mismatch.
//! - [`Retriever`] embeds a question, searches, normalizes scores and
//!   applies the similarity gate.
//! - [`AnswerSynthesizer`] abstains or asks a [`docqa_model::ChatModel`]
//!   for a grounded answer, blocking or streamed.
//!
//! ## Backends
//!
//! | Feature | Provides |
//! |---------|----------|
//! | `openai` | [`OpenAIEmbeddingProvider`] for Ark, OpenAI and Qwen |
//! | `milvus` | [`MilvusVectorStore`] over the Milvus REST API |
//! | `pdf` | PDF text extraction in [`ExtParser`] |
//!
//! [`InMemoryVectorStore`] and [`HashEmbeddingProvider`] are always available.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::*;
//!
//! let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
//! let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::default());
//! let reconciler = Arc::new(IndexReconciler::new(
//!     store.clone(),
//!     embedder.clone(),
//!     ReconcilerConfig::new("documents"),
//! ));
//!
//! let retriever = Retriever::new(embedder, store, reconciler, 0.7);
//! let retrieval = retriever.retrieve("what is a collection?", 10).await?;
//! ```

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod ingest;
pub mod intake;
#[cfg(feature = "milvus")]
pub mod milvus;
#[cfg(feature = "openai")]
pub mod openai;
pub mod reconciler;
pub mod retrieval;
pub mod vectorstore;

pub use answer::{
    Abstention, Answer, AnswerSynthesizer, StreamedAnswer, build_messages, render_context,
};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder, ReconcilerConfig};
pub use document::{Chunk, CollectionSchema, Metric, RetrievedDocument, ScoredRecord, VectorRecord};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result, Stage};
pub use inmemory::InMemoryVectorStore;
pub use ingest::{IngestReport, IngestionPipeline, IngestionPipelineBuilder};
pub use intake::{ExtParser, FileLoader, ParserKind};
#[cfg(feature = "milvus")]
pub use milvus::MilvusVectorStore;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use reconciler::{
    ActiveCollection, IndexReconciler, ReconcileAction, ReconcileOutcome,
};
pub use retrieval::{Retrieval, Retriever, normalize_score};
pub use vectorstore::VectorStore;
