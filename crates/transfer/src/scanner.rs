//! Resolves a user-supplied path into a flat list of uploadable files.
//!
//! A file path resolves to itself; a directory resolves to its top-level
//! files, or to every file below it when `recursive` is set. Hidden files
//! and files failing [`validate_file`] are reported as skipped.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::hasher::ContentHasher;
use crate::validation::validate_file;
use crate::{ResolvedFile, TransferError};

/// A path that was not queued, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Valid files, sorted by path.
    pub accepted: Vec<ResolvedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl Resolution {
    pub fn total_bytes(&self) -> u64 {
        self.accepted.iter().map(|f| f.size_bytes).sum()
    }
}

/// Resolves `root` into validated, fingerprinted files.
///
/// Fails only when `root` itself does not exist or a directory cannot be
/// read; per-file problems end up in [`Resolution::skipped`].
pub fn resolve_files(
    root: &Path,
    recursive: bool,
    max_bytes: u64,
    hasher: &ContentHasher,
) -> Result<Resolution, TransferError> {
    if !root.exists() {
        return Err(TransferError::NotFound(root.to_path_buf()));
    }

    let mut candidates = Vec::new();
    let mut resolution = Resolution::default();

    if root.is_file() {
        candidates.push(root.to_path_buf());
    } else {
        walk_dir(root, recursive, &mut candidates, &mut resolution.skipped)?;
    }
    candidates.sort();

    for path in candidates {
        match validate_file(&path, max_bytes) {
            Ok(size_bytes) => {
                let fingerprint = hasher.fingerprint(&path);
                resolution.accepted.push(ResolvedFile {
                    path,
                    size_bytes,
                    fingerprint,
                });
            }
            Err(e) => resolution.skipped.push(SkippedFile {
                path,
                reason: e.to_string(),
            }),
        }
    }

    debug!(
        root = %root.display(),
        accepted = resolution.accepted.len(),
        skipped = resolution.skipped.len(),
        "path resolved"
    );

    Ok(resolution)
}

fn walk_dir(
    current: &Path,
    recursive: bool,
    files: &mut Vec<PathBuf>,
    skipped: &mut Vec<SkippedFile>,
) -> Result<(), TransferError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if recursive {
                walk_dir(&path, recursive, files, skipped)?;
            }
        } else if file_type.is_file() || file_type.is_symlink() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                skipped.push(SkippedFile {
                    path,
                    reason: "hidden file".into(),
                });
                continue;
            }
            files.push(path);
        }
    }

    Ok(())
}
