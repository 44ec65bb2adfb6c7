use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_OVERLAP_TOKENS, DEFAULT_MAX_TOKENS_PER_CHUNK, MAX_TOKENS_PER_CHUNK_LIMIT,
};

/// Chunking parameters applied by the service when indexing a document.
///
/// Must satisfy `max_overlap_tokens < max_tokens_per_chunk` and
/// `1 <= max_tokens_per_chunk <= MAX_TOKENS_PER_CHUNK_LIMIT`. Use
/// [`ChunkConfig::new`] to construct a checked value, or call
/// [`validate`](ChunkConfig::validate) on one built by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkConfig {
    pub max_tokens_per_chunk: u32,
    pub max_overlap_tokens: u32,
}

/// Reasons a [`ChunkConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkConfigError {
    #[error("max_tokens_per_chunk must be between 1 and {limit}, got {value}")]
    TokensOutOfRange { value: u32, limit: u32 },

    #[error("max_overlap_tokens ({overlap}) must be less than max_tokens_per_chunk ({max_tokens})")]
    OverlapTooLarge { overlap: u32, max_tokens: u32 },
}

impl ChunkConfig {
    /// Creates a validated chunk configuration.
    pub fn new(max_tokens_per_chunk: u32, max_overlap_tokens: u32) -> Result<Self, ChunkConfigError> {
        let config = Self {
            max_tokens_per_chunk,
            max_overlap_tokens,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the chunking invariants.
    pub fn validate(&self) -> Result<(), ChunkConfigError> {
        if self.max_tokens_per_chunk == 0 || self.max_tokens_per_chunk > MAX_TOKENS_PER_CHUNK_LIMIT {
            return Err(ChunkConfigError::TokensOutOfRange {
                value: self.max_tokens_per_chunk,
                limit: MAX_TOKENS_PER_CHUNK_LIMIT,
            });
        }
        if self.max_overlap_tokens >= self.max_tokens_per_chunk {
            return Err(ChunkConfigError::OverlapTooLarge {
                overlap: self.max_overlap_tokens,
                max_tokens: self.max_tokens_per_chunk,
            });
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            max_overlap_tokens: DEFAULT_MAX_OVERLAP_TOKENS,
        }
    }
}

/// A single custom metadata entry attached to a document.
///
/// Serializes as `{"key": "...", "stringValue": "..."}` (or `numericValue`,
/// `stringListValue`), matching the service's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetadata {
    pub key: String,
    #[serde(flatten)]
    pub value: MetadataValue,
}

/// Value of a [`CustomMetadata`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataValue {
    StringValue(String),
    NumericValue(f64),
    StringListValue(StringList),
}

/// Wrapper matching the service's `{"values": [...]}` list encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringList {
    pub values: Vec<String>,
}

impl CustomMetadata {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: MetadataValue::StringValue(value.into()),
        }
    }

    pub fn numeric(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: MetadataValue::NumericValue(value),
        }
    }

    pub fn string_list(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            value: MetadataValue::StringListValue(StringList { values }),
        }
    }

    /// Returns the string value, if this entry holds one.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            MetadataValue::StringValue(s) => Some(s),
            _ => None,
        }
    }
}

/// A store as it appears in listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    /// Resource name, e.g. `fileSearchStores/abc123`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default)]
    pub active_documents_count: u64,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Full store details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDetail {
    #[serde(flatten)]
    pub summary: StoreSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default)]
    pub pending_documents_count: u64,
    #[serde(default)]
    pub failed_documents_count: u64,
}

/// A document as it appears in listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Resource name, e.g. `fileSearchStores/abc123/documents/def456`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

/// Full document details including its custom metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_config_default_is_valid() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_tokens_per_chunk, 512);
        assert_eq!(config.max_overlap_tokens, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn chunk_config_rejects_overlap_not_below_max() {
        let err = ChunkConfig::new(100, 150).unwrap_err();
        assert_eq!(
            err,
            ChunkConfigError::OverlapTooLarge {
                overlap: 150,
                max_tokens: 100
            }
        );
        assert!(ChunkConfig::new(100, 100).is_err());
        assert!(ChunkConfig::new(100, 99).is_ok());
    }

    #[test]
    fn chunk_config_rejects_token_bounds() {
        assert!(matches!(
            ChunkConfig::new(0, 0),
            Err(ChunkConfigError::TokensOutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            ChunkConfig::new(513, 10),
            Err(ChunkConfigError::TokensOutOfRange { value: 513, .. })
        ));
        assert!(ChunkConfig::new(1, 0).is_ok());
    }

    #[test]
    fn chunk_config_camel_case() {
        let json = serde_json::to_string(&ChunkConfig::default()).unwrap();
        assert!(json.contains("maxTokensPerChunk"));
        assert!(json.contains("maxOverlapTokens"));
    }

    #[test]
    fn custom_metadata_wire_shape() {
        let s = serde_json::to_value(CustomMetadata::string("file_extension", ".pdf")).unwrap();
        assert_eq!(s["key"], "file_extension");
        assert_eq!(s["stringValue"], ".pdf");

        let n = serde_json::to_value(CustomMetadata::numeric("file_size_mb", 1.5)).unwrap();
        assert_eq!(n["numericValue"], 1.5);

        let l = serde_json::to_value(CustomMetadata::string_list(
            "tags",
            vec!["a".into(), "b".into()],
        ))
        .unwrap();
        assert_eq!(l["stringListValue"]["values"][1], "b");
    }

    #[test]
    fn custom_metadata_parses_service_json() {
        let parsed: CustomMetadata =
            serde_json::from_str(r#"{"key":"author","stringValue":"Ada"}"#).unwrap();
        assert_eq!(parsed.key, "author");
        assert_eq!(parsed.as_str(), Some("Ada"));
    }

    #[test]
    fn store_detail_flattens_summary() {
        let json = r#"{"name":"fileSearchStores/s1","displayName":"Docs","activeDocumentsCount":3,"failedDocumentsCount":1}"#;
        let detail: StoreDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.summary.name, "fileSearchStores/s1");
        assert_eq!(detail.summary.display_name.as_deref(), Some("Docs"));
        assert_eq!(detail.summary.active_documents_count, 3);
        assert_eq!(detail.failed_documents_count, 1);
        assert_eq!(detail.pending_documents_count, 0);
    }
}
