//! Custom metadata extraction.
//!
//! [`FileMetadataExtractor`] combines three sources for each file:
//! universal file properties, structured hints parsed from the file name,
//! and format-specific [`FormatExtractor`]s (text, notebooks, PDF and
//! Office Open XML). Extraction never fails from the caller's point of
//! view: a broken format extractor is logged and the file is described by
//! whatever the other sources produced.

mod extractor;
mod filename;
mod formats;
mod office;
mod pdf;
mod properties;

pub use extractor::{FileMetadataExtractor, MetadataExtractor};
pub use filename::parse_filename;
pub use formats::{FormatExtractor, NotebookExtractor, TextExtractor};
pub use office::OfficeExtractor;
pub use pdf::PdfExtractor;
pub use properties::file_properties;

/// Errors raised by format extractors. Never surfaced past
/// [`FileMetadataExtractor`].
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("malformed {format} file: {reason}")]
    Malformed { format: &'static str, reason: String },
}
