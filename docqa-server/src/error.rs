//! Startup errors for the server.

use docqa_model::ModelError;
use docqa_rag::RagError;
use thiserror::Error;

/// Errors raised while reading configuration and wiring components.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A setting is missing, malformed or names an unknown provider.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
