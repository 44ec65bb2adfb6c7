use std::fs::File;
use std::io::Read;
use std::path::Path;

use filestore_protocol::CustomMetadata;
use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::MetadataError;
use crate::formats::FormatExtractor;

const CORE_PROPERTIES: &str = "docProps/core.xml";
const WORD_BODY: &str = "word/document.xml";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Core document properties and a size count for Office Open XML files.
///
/// Word documents report their paragraph count, presentations their slide
/// count. Keys are prefixed with the file type (`docx_title`,
/// `pptx_slide_count`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OfficeExtractor;

impl FormatExtractor for OfficeExtractor {
    fn name(&self) -> &'static str {
        "office"
    }

    fn supports(&self, extension: &str) -> bool {
        matches!(extension, ".docx" | ".pptx")
    }

    fn extract(&self, path: &Path) -> Result<Vec<CustomMetadata>, MetadataError> {
        let is_presentation = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pptx"));
        let prefix = if is_presentation { "pptx" } else { "docx" };

        let mut archive = ZipArchive::new(File::open(path)?)?;

        let mut entries = match read_entry(&mut archive, CORE_PROPERTIES)? {
            Some(xml) => core_properties(&xml, prefix)?,
            None => Vec::new(),
        };

        if is_presentation {
            let slides = archive
                .file_names()
                .filter(|n| n.starts_with(SLIDE_PREFIX) && n.ends_with(".xml"))
                .count();
            entries.push(CustomMetadata::numeric("pptx_slide_count", slides as f64));
        } else if let Some(xml) = read_entry(&mut archive, WORD_BODY)? {
            entries.push(CustomMetadata::numeric(
                "docx_paragraph_count",
                paragraph_count(&xml)? as f64,
            ));
        }

        Ok(entries)
    }
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>, MetadataError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

fn property_key(local_name: &[u8]) -> Option<&'static str> {
    Some(match local_name {
        b"title" => "title",
        b"creator" => "author",
        b"subject" => "subject",
        b"keywords" => "keywords",
        b"description" => "comments",
        b"lastModifiedBy" => "last_modified_by",
        b"created" => "created",
        b"modified" => "modified",
        _ => return None,
    })
}

/// Parses `docProps/core.xml`. Empty properties are left out.
fn core_properties(xml: &str, prefix: &str) -> Result<Vec<CustomMetadata>, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut current = None;
    let mut entries = Vec::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => current = property_key(e.local_name().as_ref()),
            Event::Text(text) => {
                if let Some(key) = current {
                    let value = text.unescape().map_err(malformed)?;
                    let value = value.trim();
                    if !value.is_empty() {
                        entries.push(CustomMetadata::string(format!("{prefix}_{key}"), value));
                    }
                }
            }
            Event::End(_) => current = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn paragraph_count(xml: &str) -> Result<usize, MetadataError> {
    let mut reader = Reader::from_str(xml);
    let mut count = 0;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"w:p" => count += 1,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(count)
}

fn malformed(e: impl std::fmt::Display) -> MetadataError {
    MetadataError::Malformed {
        format: "office",
        reason: e.to_string(),
    }
}
