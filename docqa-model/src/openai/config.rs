//! Configuration for OpenAI-compatible chat providers.

/// Base URL of the Volcengine Ark OpenAI-compatible API.
pub const ARK_API_BASE: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Base URL of the DashScope (Qwen) OpenAI-compatible API.
pub const QWEN_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default OpenAI chat model.
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4";

/// Connection settings for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAIConfig {
    /// Provider label used in logs and errors (`openai`, `ark`, `qwen`).
    pub provider: String,
    pub api_key: String,
    pub model: String,
    /// Overrides the OpenAI default base URL when set.
    pub base_url: Option<String>,
}

impl OpenAIConfig {
    /// Settings for api.openai.com.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "openai".into(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    /// Settings for Volcengine Ark.
    pub fn ark(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::compatible("ark", api_key, ARK_API_BASE, model)
    }

    /// Settings for Qwen through DashScope compatible mode.
    pub fn qwen(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::compatible("qwen", api_key, QWEN_API_BASE, model)
    }

    /// Settings for any other OpenAI-compatible endpoint.
    pub fn compatible(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: Some(base_url.into()),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}
