//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Ark (Volcengine), OpenAI and Qwen (DashScope compatible mode) all accept
//! the same request shape, so one client serves all three with a different
//! base URL. This module is only available when the `openai` feature is
//! enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Base URL of the OpenAI API.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Base URL of the Volcengine Ark API.
pub const ARK_API_BASE: &str = "https://ark.cn-beijing.volces.com/api/v3";
/// Base URL of DashScope's OpenAI-compatible mode.
pub const QWEN_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Width requested from Qwen embedding models.
pub const QWEN_EMBEDDING_DIMENSIONS: usize = 2048;

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::ark(api_key, "doubao-embedding")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for an arbitrary compatible endpoint.
    pub fn compatible(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let provider = provider.into();
        let api_key = api_key.into();
        let model = model.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError(format!("{provider} embedding API key must not be empty")));
        }
        if model.is_empty() {
            return Err(RagError::ConfigError(format!("{provider} embedding model must not be empty")));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model,
            request_dimensions: None,
        })
    }

    /// OpenAI embeddings with the given model.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::compatible("openai", OPENAI_API_BASE, api_key, model)
    }

    /// Volcengine Ark embeddings with the given endpoint model.
    pub fn ark(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::compatible("ark", ARK_API_BASE, api_key, model)
    }

    /// Qwen embeddings through DashScope, requesting 2048-wide vectors.
    pub fn qwen(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::compatible("qwen", base_url, api_key, model)?
            .with_dimensions(QWEN_EMBEDDING_DIMENSIONS))
    }

    /// Ask the API to truncate embeddings to `dims`.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.request_dimensions = Some(dims);
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingError { provider: self.provider.clone(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = %self.provider, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.failure("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = %self.provider,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.provider, error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = %self.provider, %status, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        let mut data = embedding_response.data;
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
