//! Progress aggregation across concurrent upload sessions.
//!
//! Sessions publish [`ProgressEvent`]s on a channel; a single listener task
//! applies them to the shared snapshot and notifies the optional callback.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::types::{ProgressEvent, SessionStatus};

/// Callback invoked with the snapshot after each applied event.
pub type ProgressCallback = Box<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Latest known state of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileProgress {
    pub status: SessionStatus,
    pub percent: u8,
    pub attempt: u32,
    pub message: Option<String>,
}

impl Default for FileProgress {
    fn default() -> Self {
        Self {
            status: SessionStatus::Pending,
            percent: 0,
            attempt: 0,
            message: None,
        }
    }
}

/// Point-in-time view of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub per_file: BTreeMap<PathBuf, FileProgress>,
    /// Files in a terminal state.
    pub completed_count: usize,
    pub total_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files currently uploading or waiting to retry.
    pub in_progress: usize,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.completed_count == self.total_count
    }

    /// Overall completion, 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        if self.total_count == 0 {
            return 1.0;
        }
        self.completed_count as f64 / self.total_count as f64
    }

    fn recount(&mut self) {
        self.total_count = self.per_file.len();
        self.succeeded = 0;
        self.failed = 0;
        self.in_progress = 0;
        for entry in self.per_file.values() {
            match entry.status {
                SessionStatus::Succeeded => self.succeeded += 1,
                SessionStatus::Failed => self.failed += 1,
                SessionStatus::InProgress | SessionStatus::Retrying => self.in_progress += 1,
                SessionStatus::Pending => {}
            }
        }
        self.completed_count = self.succeeded + self.failed;
    }
}

/// Single-writer progress state shared with readers.
///
/// Cheap to clone; clones share state. Every update happens under one
/// lock, so [`snapshot`](Self::snapshot) never sees a half-applied event.
#[derive(Debug, Clone, Default)]
pub struct ProgressAggregator {
    state: Arc<Mutex<ProgressSnapshot>>,
}

impl ProgressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a new batch: every path begins `Pending`.
    pub fn reset(&self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut state = self.lock();
        state.per_file = paths
            .into_iter()
            .map(|p| (p, FileProgress::default()))
            .collect();
        state.recount();
    }

    /// Applies one event. Events for a file already in a terminal state are
    /// ignored; returns whether the event was applied.
    pub fn on_event(&self, event: ProgressEvent) -> bool {
        self.apply(event).is_some()
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.lock().clone()
    }

    /// Spawns the listener that drains `events` until every sender is
    /// dropped, invoking `callback` after each applied event.
    pub fn spawn(
        &self,
        mut events: mpsc::UnboundedReceiver<ProgressEvent>,
        callback: Option<ProgressCallback>,
    ) -> JoinHandle<()> {
        let aggregator = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Some(snapshot) = aggregator.apply(event) {
                    if let Some(cb) = &callback {
                        cb(&snapshot);
                    }
                }
            }
        })
    }

    fn apply(&self, event: ProgressEvent) -> Option<ProgressSnapshot> {
        let mut state = self.lock();
        let entry = state.per_file.entry(event.path.clone()).or_default();
        if entry.status.is_terminal() {
            trace!(path = %event.path.display(), status = %event.status, "event after terminal state ignored");
            return None;
        }
        *entry = FileProgress {
            status: event.status,
            percent: event.percent,
            attempt: event.attempt,
            message: event.message,
        };
        state.recount();
        Some(state.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProgressSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
