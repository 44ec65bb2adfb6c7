//! One file, one store: the retry/backoff state machine.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use filestore_metadata::MetadataExtractor;
use filestore_protocol::CustomMetadata;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::failure_log::{FailureLog, FailureRecord};
use crate::retry::RetryPolicy;
use crate::store::{StoreService, UploadRequest};
use crate::types::{
    FileTask, ProgressEvent, SessionOutcome, SessionStatus, TerminalStatus, UploadSessionState,
};

pub(crate) const CANCELLED: &str = "cancelled";

/// Collaborators and limits shared by every session in a batch.
pub struct SessionContext {
    pub store: Arc<dyn StoreService>,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub failure_log: Arc<FailureLog>,
    pub retry: RetryPolicy,
    pub max_file_size_bytes: u64,
    /// Replaces extracted metadata when set.
    pub custom_metadata: Option<Vec<CustomMetadata>>,
    pub events: mpsc::UnboundedSender<ProgressEvent>,
    pub cancel: CancellationToken,
}

impl SessionContext {
    fn emit(&self, state: &UploadSessionState, message: Option<String>) {
        let event = ProgressEvent {
            path: state.task.path.clone(),
            status: state.status,
            percent: state.status.percent_estimate(),
            attempt: state.attempt_count,
            message,
        };
        // The listener only goes away once the batch is over.
        let _ = self.events.send(event);
    }

    /// Appends to the failure log on the blocking pool, since every append
    /// syncs to disk.
    async fn record_failure(&self, state: &UploadSessionState, error: &str) {
        let record = FailureRecord {
            path: state.task.path.clone(),
            store_id: state.task.store_id.clone(),
            error_message: error.to_string(),
            timestamp: state.finished_at.unwrap_or_else(Utc::now),
            attempt_count: state.attempt_count,
        };
        let log = Arc::clone(&self.failure_log);
        let result = tokio::task::spawn_blocking(move || log.append(&record))
            .await
            .map_err(|e| e.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!(
                path = %state.task.path.display(),
                log = %self.failure_log.path().display(),
                error = %e,
                "could not write failure log"
            );
        }
    }

    /// Extracts metadata on the blocking pool. Extractors read whole files.
    async fn extract_metadata(&self, path: &Path) -> Vec<CustomMetadata> {
        if let Some(custom) = &self.custom_metadata {
            return custom.clone();
        }
        let extractor = Arc::clone(&self.extractor);
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || extractor.extract(&owned)).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "metadata extraction aborted");
                Vec::new()
            }
        }
    }
}

/// Drives one [`FileTask`] to a terminal state.
pub struct UploadSession {
    state: UploadSessionState,
    ctx: Arc<SessionContext>,
    backoff: Vec<Duration>,
}

impl UploadSession {
    pub fn new(task: FileTask, ctx: Arc<SessionContext>) -> Self {
        Self {
            state: UploadSessionState::new(task),
            ctx,
            backoff: Vec::new(),
        }
    }

    pub fn state(&self) -> &UploadSessionState {
        &self.state
    }

    /// Runs attempts until success, a non-retryable error, exhausted
    /// retries, or cancellation observed between attempts.
    pub async fn run(mut self) -> SessionOutcome {
        self.state.started_at = Some(Utc::now());
        let terminal = self.attempt_loop().await;
        self.finish(terminal).await
    }

    /// Finalizes the session as failed without attempting an upload.
    pub async fn abort(self, reason: impl Into<String>) -> SessionOutcome {
        self.finish(TerminalStatus::Failed {
            error: reason.into(),
        })
        .await
    }

    async fn attempt_loop(&mut self) -> TerminalStatus {
        let task = &self.state.task;
        if task.size_bytes > self.ctx.max_file_size_bytes {
            return TerminalStatus::Failed {
                error: format!(
                    "file too large: {} bytes (maximum {})",
                    task.size_bytes, self.ctx.max_file_size_bytes
                ),
            };
        }

        loop {
            if self.ctx.cancel.is_cancelled() {
                return cancelled();
            }

            self.state.attempt_count += 1;
            self.transition(SessionStatus::InProgress, None);

            let request = self.build_request().await;
            let err = match self.ctx.store.upload_document(request).await {
                Ok(document_id) => return TerminalStatus::Succeeded { document_id },
                Err(e) => e,
            };
            self.state.last_error = Some(err.to_string());

            if !err.is_transient() {
                return TerminalStatus::Failed {
                    error: err.to_string(),
                };
            }

            let retries_used = self.state.attempt_count - 1;
            if retries_used >= self.ctx.retry.max_retries {
                return TerminalStatus::Failed {
                    error: format!(
                        "upload failed after {} attempts: {err}",
                        self.state.attempt_count
                    ),
                };
            }

            let delay = self.ctx.retry.delay_for_attempt(retries_used);
            warn!(
                path = %self.state.task.path.display(),
                attempt = self.state.attempt_count,
                delay_secs = delay.as_secs_f64(),
                error = %err,
                "upload attempt failed, retrying"
            );
            self.transition(
                SessionStatus::Retrying,
                Some(format!("retrying in {:.1}s: {err}", delay.as_secs_f64())),
            );

            tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => return cancelled(),
                _ = tokio::time::sleep(delay) => {}
            }
            self.backoff.push(delay);
        }
    }

    async fn build_request(&self) -> UploadRequest {
        let task = &self.state.task;
        let metadata = self.ctx.extract_metadata(&task.path).await;
        UploadRequest {
            store_id: task.store_id.clone(),
            path: task.path.clone(),
            display_name: task.display_name(),
            size_bytes: task.size_bytes,
            metadata,
            chunk_config: task.chunk_config,
        }
    }

    fn transition(&mut self, status: SessionStatus, message: Option<String>) {
        debug!(
            path = %self.state.task.path.display(),
            from = %self.state.status,
            to = %status,
            attempt = self.state.attempt_count,
            "session transition"
        );
        self.state.status = status;
        self.ctx.emit(&self.state, message);
    }

    async fn finish(mut self, terminal: TerminalStatus) -> SessionOutcome {
        self.state.finished_at = Some(Utc::now());
        match &terminal {
            TerminalStatus::Succeeded { document_id } => {
                self.transition(SessionStatus::Succeeded, None);
                info!(
                    path = %self.state.task.path.display(),
                    document = %document_id,
                    attempts = self.state.attempt_count,
                    "upload succeeded"
                );
            }
            TerminalStatus::Failed { error } => {
                self.state.last_error = Some(error.clone());
                self.transition(SessionStatus::Failed, Some(error.clone()));
                self.ctx.record_failure(&self.state, error).await;
                warn!(
                    path = %self.state.task.path.display(),
                    attempts = self.state.attempt_count,
                    error = %error,
                    "upload failed"
                );
            }
        }
        SessionOutcome {
            state: self.state,
            terminal,
            backoff: self.backoff,
        }
    }
}

fn cancelled() -> TerminalStatus {
    TerminalStatus::Failed {
        error: CANCELLED.to_string(),
    }
}
