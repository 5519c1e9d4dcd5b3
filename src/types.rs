//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by the ingestion and retrieval pipeline.
///
/// Library components log failures at the point they occur and return them
/// unchanged; only the interactive loop in the binary catches errors to keep
/// a session alive.
#[derive(Debug, Error)]
pub enum RagError {
    /// Missing, malformed, or invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A document could not be read or parsed.
    #[error("document error: {0}")]
    Document(String),

    /// The embedding provider failed. Not retried internally.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The vector store rejected or failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The response generator failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// Filesystem or terminal I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}
