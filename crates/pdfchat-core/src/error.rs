//! Error taxonomy shared by every pipeline stage.
//!
//! Each variant identifies the stage that failed so callers can decide
//! whether a retry is worthwhile. Errors are propagated unchanged in kind;
//! the pipeline never rewraps one variant as another.

use thiserror::Error;

/// Failure of a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Object storage unavailable or the key is absent.
    #[error("failed to fetch source object '{key}': {message}")]
    SourceFetch { key: String, message: String },

    /// The source file could not be turned into page text.
    #[error("text extraction failed: {0}")]
    Extraction(String),

    /// Network or API failure calling the embedding model.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The embedding API answered without usable vector data.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    /// Upsert or query against the vector store failed.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// A whole pipeline call exceeded its request-level deadline.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

impl PipelineError {
    pub fn source_fetch(key: &str, message: impl Into<String>) -> Self {
        PipelineError::SourceFetch {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_fetch_message_names_key() {
        let err = PipelineError::source_fetch("uploads/a.pdf", "HTTP 404");
        assert_eq!(
            err.to_string(),
            "failed to fetch source object 'uploads/a.pdf': HTTP 404"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = PipelineError::Timeout {
            operation: "retrieval",
            secs: 10,
        };
        assert_eq!(err.to_string(), "retrieval timed out after 10s");
    }
}
