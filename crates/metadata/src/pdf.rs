use std::path::Path;

use filestore_protocol::CustomMetadata;
use lopdf::{Dictionary, Document, Object};

use crate::MetadataError;
use crate::formats::FormatExtractor;

const INFO_FIELDS: &[(&[u8], &str)] = &[
    (b"Title", "pdf_title"),
    (b"Author", "pdf_author"),
    (b"Subject", "pdf_subject"),
    (b"Keywords", "pdf_keywords"),
    (b"Creator", "pdf_creator"),
    (b"Producer", "pdf_producer"),
    (b"CreationDate", "pdf_creation_date"),
    (b"ModDate", "pdf_modification_date"),
];

/// Page count and document information dictionary of a PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, extension: &str) -> bool {
        extension == ".pdf"
    }

    fn extract(&self, path: &Path) -> Result<Vec<CustomMetadata>, MetadataError> {
        let doc = Document::load(path)?;
        let mut entries = Vec::new();

        if let Some(info) = info_dictionary(&doc) {
            for (field, key) in INFO_FIELDS {
                let Ok(Object::String(bytes, _)) = info.get(field) else {
                    continue;
                };
                let value = text_string(bytes);
                let value = value.trim();
                if !value.is_empty() {
                    entries.push(CustomMetadata::string(*key, value));
                }
            }
        }

        entries.push(CustomMetadata::numeric(
            "pdf_page_count",
            doc.get_pages().len() as f64,
        ));
        Ok(entries)
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE or UTF-8 when marked by a byte
/// order mark, otherwise one byte per character.
fn text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xfe, 0xff, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xef, 0xbb, 0xbf, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
