//! Chat messages and conversation assembly.

use serde::{Deserialize, Serialize};

/// The author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a role name as sent by clients. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One turn of a conversation sent to a [`ChatModel`](crate::ChatModel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A history entry as received from a client, before role validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// Assemble the ordered conversation for a chat turn.
///
/// The system message comes first, then every `user`/`assistant` history entry
/// in its original order, then `question` as the final user message. History
/// entries with any other role are skipped.
pub fn build_conversation(
    system: &str,
    history: &[HistoryEntry],
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system));
    for entry in history {
        match Role::parse(&entry.role) {
            Some(Role::User) => messages.push(ChatMessage::user(&entry.content)),
            Some(Role::Assistant) => messages.push(ChatMessage::assistant(&entry.content)),
            _ => {}
        }
    }
    messages.push(ChatMessage::user(question));
    messages
}
