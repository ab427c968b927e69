//! Component construction from [`AppConfig`].
//!
//! Every capability is picked by a plain `match` on its configured name.
//! Unknown names and missing credentials fail here, before the server binds.

use std::sync::Arc;

use docqa_model::{ChatModel, MockChatModel, OpenAIClient, OpenAIConfig};
use docqa_rag::{
    Chunker, EmbeddingProvider, FixedSizeChunker, HashEmbeddingProvider, InMemoryVectorStore,
    MilvusVectorStore, OpenAIEmbeddingProvider, RecursiveChunker, ReconcilerConfig, VectorStore,
};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{Result, ServerError};
use crate::state::AppState;

/// The chat model, or `None` when generation is switched off.
pub fn chat_model(config: &AppConfig) -> Result<Option<Arc<dyn ChatModel>>> {
    let model: Arc<dyn ChatModel> = match config.chat_model_type.as_str() {
        "ark" => Arc::new(OpenAIClient::new(OpenAIConfig::ark(
            &config.ark.api_key,
            &config.ark.chat_model,
        ))?),
        "openai" => Arc::new(OpenAIClient::new(OpenAIConfig::new(
            &config.openai.api_key,
            &config.openai.chat_model,
        ))?),
        "qwen" => {
            let mut settings = OpenAIConfig::qwen(&config.qwen.api_key, &config.qwen.chat_model);
            if let Some(base_url) = &config.qwen.base_url {
                settings = settings.with_base_url(base_url);
            }
            Arc::new(OpenAIClient::new(settings)?)
        }
        "mock" => Arc::new(MockChatModel::default()),
        "none" => return Ok(None),
        other => {
            return Err(ServerError::Config(format!("unknown CHAT_MODEL_TYPE '{other}'")));
        }
    };
    Ok(Some(model))
}

pub fn embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding_model_type.as_str() {
        "ark" => Arc::new(OpenAIEmbeddingProvider::ark(
            &config.ark.api_key,
            &config.ark.embedding_model,
        )?),
        "openai" => Arc::new(OpenAIEmbeddingProvider::openai(
            &config.openai.api_key,
            &config.openai.embedding_model,
        )?),
        "qwen" => Arc::new(OpenAIEmbeddingProvider::qwen(
            config.qwen.base_url.as_deref().unwrap_or(docqa_rag::openai::QWEN_API_BASE),
            &config.qwen.api_key,
            &config.qwen.embedding_model,
        )?),
        "mock" => Arc::new(HashEmbeddingProvider::default()),
        other => {
            return Err(ServerError::Config(format!("unknown EMBEDDING_MODEL_TYPE '{other}'")));
        }
    };
    Ok(embedder)
}

pub fn vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.vector_db_type.as_str() {
        "milvus" => Arc::new(
            MilvusVectorStore::new(&config.milvus.addr)?
                .with_credentials(&config.milvus.username, &config.milvus.password),
        ),
        "memory" => Arc::new(InMemoryVectorStore::new()),
        other => return Err(ServerError::Config(format!("unknown VECTOR_DB_TYPE '{other}'"))),
    };
    Ok(store)
}

pub fn chunker(config: &AppConfig) -> Result<Arc<dyn Chunker>> {
    let (size, overlap) = (config.rag.chunk_size, config.rag.chunk_overlap);
    let chunker: Arc<dyn Chunker> = match config.splitter.as_str() {
        "fixed" => Arc::new(FixedSizeChunker::new(size, overlap)),
        "recursive" => Arc::new(RecursiveChunker::new(size, overlap)),
        other => return Err(ServerError::Config(format!("unknown SPLITTER '{other}'"))),
    };
    Ok(chunker)
}

/// Build every component and wire them into an [`AppState`].
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let chat_model = chat_model(config)?;
    let embedder = embedder(config)?;
    let store = vector_store(config)?;
    let chunker = chunker(config)?;

    info!(
        chat_model = %config.chat_model_type,
        embedding_model = %config.embedding_model_type,
        embedder = embedder.name(),
        vector_store = store.name(),
        splitter = %config.splitter,
        collection = %config.milvus.collection_name,
        "components configured"
    );

    let state = AppState::assemble(
        config.rag.clone(),
        ReconcilerConfig::new(&config.milvus.collection_name),
        embedder,
        store,
        chunker,
        chat_model,
    )?;
    Ok(state.with_upload_dir(&config.upload_dir))
}
