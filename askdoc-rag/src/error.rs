//! Error types for the `askdoc-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// None of these escape [`QueryPipeline::process_query`](crate::QueryPipeline::process_query);
/// each component converts them into a safe default at its own boundary.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether the failure is server-side and worth retrying.
        transient: bool,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A generation provider (or the whole provider chain) failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The provider, or `"chain"` when every provider failed.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A remote call did not complete within the configured deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being waited on.
        operation: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Returns `true` for failures an embedder should retry.
    ///
    /// Server-side embedding errors and timeouts are transient; client
    /// errors and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::EmbeddingError { transient, .. } => *transient,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
