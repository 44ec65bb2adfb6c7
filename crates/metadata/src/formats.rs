use std::path::Path;

use filestore_protocol::CustomMetadata;
use serde_json::Value;

use crate::MetadataError;

/// Extracts format-specific metadata from files of particular types.
pub trait FormatExtractor: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Whether this extractor handles `extension` (lowercase, leading dot).
    fn supports(&self, extension: &str) -> bool;

    fn extract(&self, path: &Path) -> Result<Vec<CustomMetadata>, MetadataError>;
}

/// Line and word counts for plain text, plus the first heading of a
/// Markdown document.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl FormatExtractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports(&self, extension: &str) -> bool {
        matches!(extension, ".txt" | ".md")
    }

    fn extract(&self, path: &Path) -> Result<Vec<CustomMetadata>, MetadataError> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|e| MetadataError::Malformed {
            format: "text",
            reason: e.to_string(),
        })?;

        let mut entries = vec![
            CustomMetadata::numeric("text_line_count", text.lines().count() as f64),
            CustomMetadata::numeric("text_word_count", text.split_whitespace().count() as f64),
        ];

        let is_markdown = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("md"));
        if is_markdown {
            let title = text
                .lines()
                .find_map(|l| l.strip_prefix("# "))
                .map(str::trim)
                .filter(|t| !t.is_empty());
            if let Some(title) = title {
                entries.push(CustomMetadata::string("markdown_title", title));
            }
        }

        Ok(entries)
    }
}

/// Cell counts and kernel language of a Jupyter notebook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotebookExtractor;

impl FormatExtractor for NotebookExtractor {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn supports(&self, extension: &str) -> bool {
        extension == ".ipynb"
    }

    fn extract(&self, path: &Path) -> Result<Vec<CustomMetadata>, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&content)?;

        let cells = doc["cells"]
            .as_array()
            .ok_or_else(|| MetadataError::Malformed {
                format: "notebook",
                reason: "missing cells array".into(),
            })?;
        let code_cells = cells
            .iter()
            .filter(|c| c["cell_type"].as_str() == Some("code"))
            .count();

        let mut entries = vec![
            CustomMetadata::numeric("notebook_cell_count", cells.len() as f64),
            CustomMetadata::numeric("notebook_code_cell_count", code_cells as f64),
        ];

        let language = doc["metadata"]["kernelspec"]["language"]
            .as_str()
            .or_else(|| doc["metadata"]["language_info"]["name"].as_str());
        if let Some(language) = language {
            entries.push(CustomMetadata::string("notebook_language", language));
        }

        Ok(entries)
    }
}
