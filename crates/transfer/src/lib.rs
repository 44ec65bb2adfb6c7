//! Local-file side of an upload: content fingerprints, validation, and
//! resolution of a user path into a flat list of uploadable files.

mod hasher;
mod scanner;
mod validation;

use std::path::PathBuf;

pub use hasher::{ContentHasher, Fingerprint, checksum_bytes};
pub use scanner::{Resolution, SkippedFile, resolve_files};
pub use validation::{mb_to_bytes, validate_file};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    #[error("{0}")]
    InvalidFile(String),
}

/// A file that passed validation and is ready to be queued for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub fingerprint: Fingerprint,
}

impl ResolvedFile {
    /// Resolves a single path: reads its size and fingerprints its content.
    ///
    /// No validation is applied; use [`validate_file`] first when the
    /// path comes from the user.
    pub fn from_path(path: impl Into<PathBuf>, hasher: &ContentHasher) -> Result<Self, TransferError> {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path)?.len();
        let fingerprint = hasher.fingerprint(&path);
        Ok(Self {
            path,
            size_bytes,
            fingerprint,
        })
    }
}
