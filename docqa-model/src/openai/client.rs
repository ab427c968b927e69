//! OpenAI-compatible chat client.

use async_openai::{
    Client, config::OpenAIConfig as AsyncOpenAIConfig, types::CreateChatCompletionRequestArgs,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use super::convert;
use crate::error::{ModelError, Result};
use crate::message::ChatMessage;
use crate::model::{ChatModel, FragmentStream};

/// Chat client for OpenAI and OpenAI-compatible APIs (Ark, Qwen).
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    provider: String,
    model: String,
}

impl OpenAIClient {
    /// Create a new client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Config(format!(
                "{} chat model requires an API key",
                config.provider
            )));
        }
        if config.model.is_empty() {
            return Err(ModelError::Config(format!(
                "{} chat model requires a model name",
                config.provider
            )));
        }

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            provider: config.provider,
            model: config.model,
        })
    }

    /// The provider label this client was configured with.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    fn request_error(&self, e: impl std::fmt::Display) -> ModelError {
        ModelError::Request { provider: self.provider.clone(), message: e.to_string() }
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        debug!(provider = %self.provider, model = %self.model, messages = messages.len(), "generating");

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(convert::to_request_messages(messages)?)
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build request: {e}")))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "chat completion failed");
            self.request_error(e)
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(ChatMessage::assistant(content))
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
        debug!(provider = %self.provider, model = %self.model, messages = messages.len(), "opening stream");

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(convert::to_request_messages(messages)?)
            .stream(true)
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build request: {e}")))?;

        let mut upstream = self.client.chat().create_stream(request).await.map_err(|e| {
            error!(provider = %self.provider, error = %e, "failed to open chat stream");
            self.request_error(e)
        })?;

        let stream = try_stream! {
            while let Some(result) = upstream.next().await {
                let chunk = result.map_err(|e| ModelError::Stream(e.to_string()))?;
                yield convert::chunk_content(&chunk);
            }
        };

        Ok(Box::pin(stream))
    }
}
