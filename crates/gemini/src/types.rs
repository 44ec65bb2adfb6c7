//! Wire types of the file-search REST API.
//!
//! int64 fields arrive as JSON strings; [`int64`] accepts both forms.

use filestore_protocol::{
    ChunkConfig, CustomMetadata, DocumentDetail, DocumentSummary, StoreDetail, StoreSummary,
};
use serde::{Deserialize, Deserializer, Serialize};

/// A file-search store resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSearchStore {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default, deserialize_with = "int64")]
    pub active_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub pending_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub failed_documents_count: u64,
    #[serde(default, deserialize_with = "int64")]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStoresResponse {
    #[serde(default)]
    pub file_search_stores: Vec<FileSearchStore>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A document inside a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub custom_metadata: Vec<CustomMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    /// `STATE_PENDING`, `STATE_ACTIVE` or `STATE_FAILED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "int64")]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A long-running operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<Status>,
    #[serde(default)]
    pub response: Option<serde_json::Value>,
}

impl Operation {
    /// Name of the document created by a finished upload operation.
    pub fn document_name(&self) -> Option<&str> {
        self.response.as_ref()?.get("documentName")?.as_str()
    }
}

/// Error payload of a failed operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// Metadata sent when starting an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub display_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
    pub chunking_config: ChunkingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingConfig {
    pub white_space_config: ChunkConfig,
}

impl From<ChunkConfig> for ChunkingConfig {
    fn from(config: ChunkConfig) -> Self {
        Self {
            white_space_config: config,
        }
    }
}

impl From<FileSearchStore> for StoreSummary {
    fn from(s: FileSearchStore) -> Self {
        StoreSummary {
            name: s.name,
            display_name: s.display_name,
            create_time: s.create_time,
            active_documents_count: s.active_documents_count,
            size_bytes: s.size_bytes,
        }
    }
}

impl From<FileSearchStore> for StoreDetail {
    fn from(s: FileSearchStore) -> Self {
        let update_time = s.update_time.clone();
        let pending = s.pending_documents_count;
        let failed = s.failed_documents_count;
        StoreDetail {
            summary: s.into(),
            update_time,
            pending_documents_count: pending,
            failed_documents_count: failed,
        }
    }
}

impl From<Document> for DocumentSummary {
    fn from(d: Document) -> Self {
        DocumentSummary {
            name: d.name,
            display_name: d.display_name,
            state: d.state,
            mime_type: d.mime_type,
            size_bytes: d.size_bytes,
            create_time: d.create_time,
        }
    }
}

impl From<Document> for DocumentDetail {
    fn from(mut d: Document) -> Self {
        let update_time = d.update_time.take();
        let custom_metadata = std::mem::take(&mut d.custom_metadata);
        DocumentDetail {
            summary: d.into(),
            update_time,
            custom_metadata,
        }
    }
}

/// Accepts an int64 encoded either as a JSON string or a number.
fn int64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
