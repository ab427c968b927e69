//! # docqa-model
//!
//! The generation capability for docqa: a uniform [`ChatModel`] trait over
//! chat providers, conversation assembly, and the streaming delivery state
//! machine that frames incremental output for callers.
//!
//! ## Providers
//!
//! | Name | Backend |
//! |------|---------|
//! | `ark` | Volcengine Ark (OpenAI-compatible) |
//! | `openai` | OpenAI chat completions |
//! | `qwen` | DashScope compatible mode |
//! | `mock` | [`MockChatModel`], echoes the question |
//!
//! ## Streaming
//!
//! ```rust,ignore
//! use docqa_model::{ChatMessage, deliver};
//! use futures::StreamExt;
//!
//! let messages = vec![ChatMessage::user("hello")];
//! let mut events = deliver(async move { model.stream(&messages).await });
//! while let Some(event) = events.next().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod error;
pub mod message;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
pub mod streaming;

pub use error::{ModelError, Result};
pub use message::{ChatMessage, HistoryEntry, Role, build_conversation};
pub use mock::MockChatModel;
pub use model::{ChatModel, FragmentStream};
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
pub use streaming::{
    DeliveryMachine, DeliveryState, EventStream, StreamEvent, deliver, deliver_text,
};
