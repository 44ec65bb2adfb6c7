use std::path::Path;

use filestore_protocol::constants::is_supported_extension;

use crate::TransferError;

/// Converts a MiB limit to bytes.
pub fn mb_to_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}

/// Validates that a path can be uploaded and returns its size in bytes.
///
/// Rejects:
/// - Missing paths
/// - Directories and other non-files
/// - Empty files
/// - Files larger than `max_bytes`
/// - Unsupported extensions
pub fn validate_file(path: &Path, max_bytes: u64) -> Result<u64, TransferError> {
    if !path.exists() {
        return Err(TransferError::NotFound(path.to_path_buf()));
    }

    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(TransferError::InvalidFile(format!(
            "not a file: {}",
            path.display()
        )));
    }

    let size = metadata.len();
    if size == 0 {
        return Err(TransferError::InvalidFile(format!(
            "file is empty: {}",
            path.display()
        )));
    }

    if size > max_bytes {
        return Err(TransferError::InvalidFile(format!(
            "file too large: {size} bytes (maximum {max_bytes})"
        )));
    }

    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    if !is_supported_extension(&extension) {
        let shown = if extension.is_empty() {
            "(none)".to_string()
        } else {
            extension.to_ascii_lowercase()
        };
        return Err(TransferError::InvalidFile(format!(
            "unsupported file type: {shown}"
        )));
    }

    Ok(size)
}
