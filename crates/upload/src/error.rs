//! Upload error types.

use filestore_protocol::ChunkConfigError;
use filestore_protocol::constants::is_retryable_message;

/// Classified outcome of a failed remote store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Network failure, rate limit or server-side error; worth retrying.
    #[error("transient error: {0}")]
    Transient(String),

    /// Invalid input, quota exceeded or any other condition a retry cannot fix.
    #[error("{0}")]
    NonRetryable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A non-forced delete of a store that still holds documents.
    #[error("store is not empty: {0}")]
    NonEmpty(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Classifies a raw error message by the retryable patterns.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_retryable_message(&message) {
            StoreError::Transient(message)
        } else {
            StoreError::NonRetryable(message)
        }
    }
}

/// Errors that prevent a batch from being dispatched at all.
///
/// Per-file failures never surface here; they are reported in
/// [`BatchResult::failed`](crate::BatchResult::failed).
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no files to upload")]
    EmptyBatch,

    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("invalid chunk configuration: {0}")]
    InvalidChunkConfig(#[from] ChunkConfigError),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
