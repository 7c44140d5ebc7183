//! Error types for the `rag-assistant` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or serving chat turns.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Document ingestion failed (empty input, degenerate chunking parameters,
    /// or a downstream failure while populating the store).
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// An embedding provider call failed.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector store operation failed.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Rewriting a follow-up question into a standalone query failed.
    #[error("Reformulation error: {0}")]
    Reformulation(String),

    /// Answer generation failed. Terminal for the turn.
    #[error("Generation error: {0}")]
    Generation(String),

    /// A caller-supplied argument was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Retrieval (query embedding or similarity search) exceeded the
    /// configured timeout.
    #[error("Retrieval timed out after {timeout_ms} ms")]
    RetrievalTimeout {
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    /// Whether the orchestrator's retry policy may re-attempt the failed
    /// operation. Argument and configuration errors are deterministic and
    /// never retried; provider and store failures are treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AssistantError::InvalidArgument(_)
                | AssistantError::Config(_)
                | AssistantError::Ingestion(_)
        )
    }
}

/// A convenience result type for assistant operations.
pub type Result<T> = std::result::Result<T, AssistantError>;
