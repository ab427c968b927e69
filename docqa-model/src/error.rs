//! Error types for the `docqa-model` crate.

use thiserror::Error;

/// Errors raised by chat model integrations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model could not be built from its configuration.
    #[error("Model configuration error: {0}")]
    Config(String),

    /// A request to the provider failed before any output was produced.
    #[error("Model request failed ({provider}): {message}")]
    Request {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The provider's incremental stream failed part-way through.
    #[error("Model stream error: {0}")]
    Stream(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
