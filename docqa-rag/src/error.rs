//! Error types for the `docqa-rag` crate.

use std::fmt;

use thiserror::Error;

/// A named step of the ingestion or answer pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Parse,
    Split,
    Reconcile,
    Embed,
    Index,
    Retrieve,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Parse => "parse",
            Self::Split => "split",
            Self::Reconcile => "reconcile",
            Self::Embed => "embed",
            Self::Index => "index",
            Self::Retrieve => "retrieve",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An existing collection's vector width differs from the required one.
    #[error(
        "Collection '{collection}' schema mismatch: vector width is {actual}, expected {expected}"
    )]
    SchemaMismatch {
        collection: String,
        /// The width the caller asked for.
        expected: usize,
        /// The width the existing collection was built with.
        actual: usize,
    },

    /// A document could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Reading a source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// The request was rejected before any collaborator was called.
    #[error("Invalid input: {0}")]
    InputError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required capability was never configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The chat model failed while producing an answer.
    #[error(transparent)]
    Generation(#[from] docqa_model::ModelError),

    /// A collaborator failed inside a named pipeline stage.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<RagError>,
    },
}

impl RagError {
    /// Wrap this error with the pipeline stage it came from.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage { stage, source: Box::new(other) },
        }
    }

    /// The stage this error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, skipping stage wrappers.
    pub fn root(&self) -> &RagError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the caller's input was at fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self.root(), Self::InputError(_))
    }

    /// Whether a capability or setting is missing or invalid.
    pub fn is_config_error(&self) -> bool {
        matches!(self.root(), Self::ConfigError(_) | Self::NotConfigured(_))
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
