//! [`StoreService`] over the Gemini REST client.

use filestore_gemini::{Client, Error as ApiError, types::UploadMetadata};
use filestore_protocol::{DocumentDetail, DocumentSummary, StoreDetail, StoreSummary};
use filestore_upload::{StoreError, StoreFuture, StoreService, UploadRequest};

const STORE_PREFIX: &str = "fileSearchStores/";

pub(crate) struct GeminiStore {
    client: Client,
}

impl GeminiStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Accepts a bare store ID or a full resource name.
pub(crate) fn store_name(id: &str) -> String {
    if id.starts_with(STORE_PREFIX) {
        id.to_string()
    } else {
        format!("{STORE_PREFIX}{id}")
    }
}

fn classify(err: ApiError) -> StoreError {
    if err.is_not_found() {
        StoreError::NotFound(err.to_string())
    } else if err.is_transient() {
        StoreError::Transient(err.to_string())
    } else {
        StoreError::NonRetryable(err.to_string())
    }
}

impl StoreService for GeminiStore {
    fn create_store(&self, display_name: Option<&str>) -> StoreFuture<'_, String> {
        let display_name = display_name.map(str::to_string);
        Box::pin(async move {
            let store = self
                .client
                .create_store(display_name.as_deref())
                .await
                .map_err(classify)?;
            Ok(store.name)
        })
    }

    fn list_stores(&self) -> StoreFuture<'_, Vec<StoreSummary>> {
        Box::pin(async move {
            let stores = self.client.list_stores().await.map_err(classify)?;
            Ok(stores.into_iter().map(Into::into).collect())
        })
    }

    fn get_store(&self, store_id: &str) -> StoreFuture<'_, StoreDetail> {
        let name = store_name(store_id);
        Box::pin(async move {
            let store = self.client.get_store(&name).await.map_err(classify)?;
            Ok(store.into())
        })
    }

    fn delete_store(&self, store_id: &str, force: bool) -> StoreFuture<'_, ()> {
        let name = store_name(store_id);
        Box::pin(async move {
            self.client
                .delete_store(&name, force)
                .await
                .map_err(|e| {
                    if !force && e.is_failed_precondition() {
                        StoreError::NonEmpty(name.clone())
                    } else {
                        classify(e)
                    }
                })
        })
    }

    fn upload_document(&self, request: UploadRequest) -> StoreFuture<'_, String> {
        Box::pin(async move {
            let metadata = UploadMetadata {
                display_name: request.display_name,
                custom_metadata: request.metadata,
                chunking_config: request.chunk_config.into(),
                mime_type: None,
            };
            self.client
                .upload_document(&store_name(&request.store_id), &request.path, &metadata)
                .await
                .map_err(classify)
        })
    }

    fn list_documents(&self, store_id: &str) -> StoreFuture<'_, Vec<DocumentSummary>> {
        let name = store_name(store_id);
        Box::pin(async move {
            let docs = self.client.list_documents(&name).await.map_err(classify)?;
            Ok(docs.into_iter().map(Into::into).collect())
        })
    }

    fn get_document(&self, document_id: &str) -> StoreFuture<'_, DocumentDetail> {
        let name = document_id.to_string();
        Box::pin(async move {
            let doc = self.client.get_document(&name).await.map_err(classify)?;
            Ok(doc.into())
        })
    }

    fn delete_document(&self, document_id: &str, force: bool) -> StoreFuture<'_, ()> {
        let name = document_id.to_string();
        Box::pin(async move {
            self.client
                .delete_document(&name, force)
                .await
                .map_err(classify)
        })
    }
}
