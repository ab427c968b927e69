//! Conversion between docqa messages and async-openai request types.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionStreamResponse,
};

use crate::error::{ModelError, Result};
use crate::message::{ChatMessage, Role};

pub(crate) fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let converted: std::result::Result<ChatCompletionRequestMessage, _> = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content.as_str())
            .build()
            .map(Into::into),
    };
    converted.map_err(|e| ModelError::Config(format!("invalid message: {e}")))
}

pub(crate) fn to_request_messages(
    messages: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages.iter().map(to_request_message).collect()
}

/// Concatenate the delta content of every choice in a stream chunk.
pub(crate) fn chunk_content(chunk: &CreateChatCompletionStreamResponse) -> String {
    chunk.choices.iter().filter_map(|choice| choice.delta.content.as_deref()).collect()
}
