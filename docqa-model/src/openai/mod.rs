//! OpenAI-compatible chat providers.
//!
//! Ark and Qwen both expose OpenAI-compatible chat completion endpoints, so a
//! single [`OpenAIClient`] serves all three providers; only the base URL and
//! credentials differ.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let ark = OpenAIClient::new(OpenAIConfig::ark(std::env::var("ARK_KEY")?, "doubao-pro-32k"))?;
//! let gpt = OpenAIClient::new(OpenAIConfig::new(std::env::var("OPENAI_KEY")?, "gpt-4o-mini"))?;
//! ```

mod client;
mod config;
mod convert;

pub use client::OpenAIClient;
pub use config::{ARK_API_BASE, DEFAULT_OPENAI_CHAT_MODEL, OpenAIConfig, QWEN_API_BASE};
