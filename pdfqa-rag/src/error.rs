//! Error types for the `pdfqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing or answering.
#[derive(Debug, Error)]
pub enum RagError {
    /// The PDF could not be opened or yielded no text.
    #[error("Loader error ({path}): {message}")]
    LoaderError {
        /// The file that failed to load.
        path: String,
        /// A description of the failure.
        message: String,
    },

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

    /// The chat model failed to produce a completion.
    #[error("Chat model error ({provider}): {message}")]
    ChatModelError {
        /// The chat provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The supplied PDF identifier is not usable as a collection key.
    #[error("Invalid PDF id: {0}")]
    InvalidPdfId(String),

    /// An error in the index/answer orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
