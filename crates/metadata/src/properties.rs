use std::path::Path;

use chrono::{DateTime, Utc};
use filestore_protocol::CustomMetadata;
use tracing::debug;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Universal properties available for any file: extension, size in MiB
/// (two decimals), upload timestamp and modification time.
///
/// Properties that cannot be read are left out; the extension and upload
/// timestamp are always present when the path has an extension.
pub fn file_properties(path: &Path) -> Vec<CustomMetadata> {
    let mut entries = Vec::with_capacity(4);

    if let Some(ext) = path.extension() {
        let ext = format!(".{}", ext.to_string_lossy().to_ascii_lowercase());
        entries.push(CustomMetadata::string("file_extension", ext));
    }

    let stat = std::fs::metadata(path);
    if let Ok(meta) = &stat {
        entries.push(CustomMetadata::numeric(
            "file_size_mb",
            round2(meta.len() as f64 / BYTES_PER_MB),
        ));
    }

    entries.push(CustomMetadata::string(
        "upload_timestamp",
        Utc::now().to_rfc3339(),
    ));

    match stat.and_then(|m| m.modified()) {
        Ok(modified) => {
            let modified: DateTime<Utc> = modified.into();
            entries.push(CustomMetadata::string("file_modified", modified.to_rfc3339()));
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no modification time"),
    }

    entries
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
