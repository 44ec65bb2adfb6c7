//! Shared types for filestore.
//!
//! Everything here is plain data: chunking configuration, custom metadata
//! entries, and the store/document views returned by the remote service.
//! No I/O happens in this crate.

pub mod constants;
pub mod types;

pub use types::{
    ChunkConfig, ChunkConfigError, CustomMetadata, DocumentDetail, DocumentSummary,
    MetadataValue, StoreDetail, StoreSummary, StringList,
};
