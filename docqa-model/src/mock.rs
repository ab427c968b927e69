//! Mock chat model for tests and offline runs.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ModelError, Result};
use crate::message::{ChatMessage, Role};
use crate::model::{ChatModel, FragmentStream};

#[derive(Debug, Clone)]
enum Step {
    Text(String),
    Fail(String),
}

/// A scripted [`ChatModel`].
///
/// Without a script it echoes the last user message back as a single
/// fragment. Every request is recorded and can be inspected with
/// [`MockChatModel::requests`].
#[derive(Debug, Clone)]
pub struct MockChatModel {
    name: String,
    script: Option<Vec<Step>>,
    open_error: Option<String>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockChatModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), script: None, open_error: None, requests: Arc::default() }
    }

    /// Reply with these fragments, in order.
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = Some(fragments.into_iter().map(|f| Step::Text(f.into())).collect());
        self
    }

    /// Fail the stream with `message` after the scripted fragments.
    pub fn failing_after(mut self, message: impl Into<String>) -> Self {
        self.script.get_or_insert_with(Vec::new).push(Step::Fail(message.into()));
        self
    }

    /// Fail every request before any output is produced.
    pub fn failing_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// All message sequences this model has received.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, messages: &[ChatMessage]) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        match &self.open_error {
            Some(message) => {
                Err(ModelError::Request { provider: "mock".into(), message: message.clone() })
            }
            None => Ok(()),
        }
    }

    fn steps(&self, messages: &[ChatMessage]) -> Vec<Step> {
        match &self.script {
            Some(script) => script.clone(),
            None => {
                let echo = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                vec![Step::Text(echo)]
            }
        }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
        self.record(messages)?;
        let mut content = String::new();
        for step in self.steps(messages) {
            match step {
                Step::Text(text) => content.push_str(&text),
                Step::Fail(message) => {
                    return Err(ModelError::Request { provider: "mock".into(), message });
                }
            }
        }
        Ok(ChatMessage::assistant(content))
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream> {
        self.record(messages)?;
        let items: Vec<Result<String>> = self
            .steps(messages)
            .into_iter()
            .map(|step| match step {
                Step::Text(text) => Ok(text),
                Step::Fail(message) => Err(ModelError::Stream(message)),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
