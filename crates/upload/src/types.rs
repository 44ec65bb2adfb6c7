//! Data types for the upload flow.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use filestore_protocol::ChunkConfig;
use filestore_transfer::Fingerprint;
use serde::Serialize;

/// One file queued for upload to one store. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub fingerprint: Fingerprint,
    pub store_id: String,
    pub chunk_config: ChunkConfig,
}

impl FileTask {
    /// Name shown for the uploaded document: the file name.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Lifecycle of an upload session.
///
/// `Pending -> InProgress -> {Succeeded | Retrying -> InProgress | Failed}`.
/// `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Retrying,
    Succeeded,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Failed)
    }

    /// Coarse completion estimate. The remote call reports no byte-level
    /// progress, so anything in flight sits at the midpoint.
    pub fn percent_estimate(self) -> u8 {
        match self {
            SessionStatus::Pending => 0,
            SessionStatus::InProgress | SessionStatus::Retrying => 50,
            SessionStatus::Succeeded | SessionStatus::Failed => 100,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Pending => "pending",
            SessionStatus::InProgress => "uploading",
            SessionStatus::Retrying => "retrying",
            SessionStatus::Succeeded => "done",
            SessionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Published on every session state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub path: PathBuf,
    pub status: SessionStatus,
    pub percent: u8,
    /// Attempts started so far.
    pub attempt: u32,
    pub message: Option<String>,
}

/// Mutable state of one session. Owned by the session; only copies leave
/// it, through [`ProgressEvent`]s and the final [`SessionOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSessionState {
    pub task: FileTask,
    /// Upload attempts started so far.
    pub attempt_count: u32,
    pub last_error: Option<String>,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl UploadSessionState {
    pub fn new(task: FileTask) -> Self {
        Self {
            task,
            attempt_count: 0,
            last_error: None,
            status: SessionStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded { document_id: String },
    Failed { error: String },
}

impl TerminalStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Succeeded { .. })
    }
}

/// Final state of a session plus the backoff delays it slept through.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub state: UploadSessionState,
    pub terminal: TerminalStatus,
    pub backoff: Vec<Duration>,
}

impl SessionOutcome {
    pub fn path(&self) -> &PathBuf {
        &self.state.task.path
    }
}

/// Per-file result of a batch. Every input file lands in exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    /// Repeated paths and, under [`DuplicatePolicy::Skip`], repeated content.
    pub skipped_duplicates: Vec<PathBuf>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped_duplicates.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Files sharing one content fingerprint. The first entry is canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    pub fn canonical(&self) -> &PathBuf {
        &self.files[0]
    }

    pub fn duplicates(&self) -> &[PathBuf] {
        &self.files[1..]
    }
}

/// What to do with files whose content was already seen in the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Upload the first occurrence, report the rest as skipped.
    #[default]
    Skip,
    /// Upload every file regardless of content.
    UploadAll,
}
