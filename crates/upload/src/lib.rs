//! Upload orchestration for the remote file-search service.
//!
//! [`UploadOrchestrator::upload_batch`] deduplicates a resolved file list,
//! runs one [`UploadSession`] per file on a bounded [`UploadWorkerPool`],
//! streams state changes into a [`ProgressAggregator`], and appends every
//! terminal failure to the [`FailureLog`].

pub mod dedup;
pub mod error;
pub mod failure_log;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use dedup::find_duplicate_groups;
pub use error::{StoreError, UploadError};
pub use failure_log::{FailureLog, FailureRecord};
pub use orchestrator::UploadOrchestrator;
pub use pool::UploadWorkerPool;
pub use progress::{FileProgress, ProgressAggregator, ProgressCallback, ProgressSnapshot};
pub use retry::RetryPolicy;
pub use session::{SessionContext, UploadSession};
pub use settings::UploadSettings;
pub use store::{StoreFuture, StoreService, UploadRequest};
pub use types::{
    BatchResult, DuplicateGroup, DuplicatePolicy, FileTask, ProgressEvent, SessionOutcome,
    SessionStatus, TerminalStatus, UploadSessionState,
};
