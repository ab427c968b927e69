//! The generation capability shared by every chat provider.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::message::ChatMessage;

/// A lazy, finite, non-restartable sequence of content fragments.
///
/// Consumers pull one fragment at a time. Dropping the stream stops
/// consumption and releases the underlying provider connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat model that turns a message sequence into a reply.
///
/// Implementations wrap a specific provider behind a uniform async
/// interface and are selected once at startup by configuration.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_model::{ChatMessage, ChatModel};
///
/// let reply = model.generate(&[ChatMessage::user("hello")]).await?;
/// let mut fragments = model.stream(&[ChatMessage::user("hello")]).await?;
/// ```
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// The provider-facing model name, used in logs.
    fn name(&self) -> &str;

    /// Generate one complete reply.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<ChatMessage>;

    /// Open an incremental reply stream.
    ///
    /// An error here means the stream could not be opened at all; failures
    /// after that surface as `Err` items of the returned stream.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<FragmentStream>;
}
