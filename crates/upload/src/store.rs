//! Remote store service abstraction.
//!
//! `StoreService` is implemented by the application on top of the HTTP
//! client. Keeping it a trait lets the upload core run against mocks.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use filestore_protocol::{
    ChunkConfig, CustomMetadata, DocumentDetail, DocumentSummary, StoreDetail, StoreSummary,
};

use crate::error::StoreError;

/// Boxed future returned by [`StoreService`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Everything the service needs to ingest one file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub store_id: String,
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
    pub metadata: Vec<CustomMetadata>,
    pub chunk_config: ChunkConfig,
}

/// Operations on the remote file-search service.
pub trait StoreService: Send + Sync {
    /// Creates a store and returns its resource name.
    fn create_store(&self, display_name: Option<&str>) -> StoreFuture<'_, String>;

    fn list_stores(&self) -> StoreFuture<'_, Vec<StoreSummary>>;

    fn get_store(&self, store_id: &str) -> StoreFuture<'_, StoreDetail>;

    /// Deletes a store. Without `force`, a store holding documents yields
    /// [`StoreError::NonEmpty`].
    fn delete_store(&self, store_id: &str, force: bool) -> StoreFuture<'_, ()>;

    /// Uploads one file and returns the created document's resource name.
    ///
    /// Every call must open a fresh upload channel; a channel from an
    /// earlier attempt is never reused.
    fn upload_document(&self, request: UploadRequest) -> StoreFuture<'_, String>;

    fn list_documents(&self, store_id: &str) -> StoreFuture<'_, Vec<DocumentSummary>>;

    fn get_document(&self, document_id: &str) -> StoreFuture<'_, DocumentDetail>;

    fn delete_document(&self, document_id: &str, force: bool) -> StoreFuture<'_, ()>;
}
