//! Durable, append-only record of terminal upload failures.
//!
//! Stored as JSON Lines: one [`FailureRecord`] per line. Each append is
//! flushed to disk before returning.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::UploadError;

/// A terminal upload failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub store_id: String,
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
    /// Upload attempts made before giving up (0 if none started).
    pub attempt_count: u32,
}

/// Append-only failure log backed by a file.
///
/// Appends from concurrent sessions are serialized by an internal lock.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `record` and syncs it to disk.
    pub fn append(&self, record: &FailureRecord) -> Result<(), UploadError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        debug!(path = %record.path.display(), log = %self.path.display(), "failure recorded");
        Ok(())
    }

    /// Reads every record in append order. A missing log is empty;
    /// unparsable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<FailureRecord>, UploadError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    log = %self.path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping unreadable failure log entry"
                ),
            }
        }
        Ok(records)
    }

    /// Removes every record. Irreversible.
    pub fn clear(&self) -> Result<(), UploadError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.path.exists() {
            return Ok(());
        }
        let file = File::create(&self.path)?;
        file.sync_all()?;
        debug!(log = %self.path.display(), "failure log cleared");
        Ok(())
    }
}
