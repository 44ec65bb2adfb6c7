use std::collections::HashSet;
use std::path::Path;

use filestore_protocol::CustomMetadata;
use filestore_protocol::constants::MAX_METADATA_ENTRIES;
use tracing::{debug, warn};

use crate::filename::parse_filename;
use crate::formats::{FormatExtractor, NotebookExtractor, TextExtractor};
use crate::office::OfficeExtractor;
use crate::pdf::PdfExtractor;
use crate::properties::file_properties;

/// Produces the custom metadata attached to an uploaded document.
///
/// Implementations must not fail: on internal errors they return whatever
/// subset they could recover.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Vec<CustomMetadata>;
}

/// Default extractor: universal properties, then format-specific entries,
/// then filename hints, capped at [`MAX_METADATA_ENTRIES`].
///
/// Universal properties come first so the cap never drops them. Keys are
/// unique; the first source to produce a key wins.
pub struct FileMetadataExtractor {
    formats: Vec<Box<dyn FormatExtractor>>,
    max_entries: usize,
}

impl Default for FileMetadataExtractor {
    fn default() -> Self {
        Self::new()
            .with_format(Box::new(TextExtractor))
            .with_format(Box::new(NotebookExtractor))
            .with_format(Box::new(PdfExtractor))
            .with_format(Box::new(OfficeExtractor))
    }
}

impl FileMetadataExtractor {
    /// Creates an extractor with no format-specific extractors.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
            max_entries: MAX_METADATA_ENTRIES,
        }
    }

    pub fn with_format(mut self, format: Box<dyn FormatExtractor>) -> Self {
        self.formats.push(format);
        self
    }

    /// Overrides the entry cap (clamped to [`MAX_METADATA_ENTRIES`]).
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.min(MAX_METADATA_ENTRIES);
        self
    }

    fn format_entries(&self, path: &Path) -> Vec<CustomMetadata> {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();

        let mut entries = Vec::new();
        for format in self.formats.iter().filter(|f| f.supports(&extension)) {
            match format.extract(path) {
                Ok(found) => entries.extend(found),
                Err(e) => warn!(
                    path = %path.display(),
                    format = format.name(),
                    error = %e,
                    "format metadata extraction failed, continuing without it"
                ),
            }
        }
        entries
    }
}

impl MetadataExtractor for FileMetadataExtractor {
    fn extract(&self, path: &Path) -> Vec<CustomMetadata> {
        let mut seen = HashSet::new();
        let entries: Vec<CustomMetadata> = file_properties(path)
            .into_iter()
            .chain(self.format_entries(path))
            .chain(parse_filename(path))
            .filter(|e| seen.insert(e.key.clone()))
            .take(self.max_entries)
            .collect();

        debug!(path = %path.display(), count = entries.len(), "metadata extracted");
        entries
    }
}
