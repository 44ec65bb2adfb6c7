//! File-search REST client.
//!
//! Async HTTP client using `reqwest`, authenticated with the
//! `x-goog-api-key` header. Uploads use the resumable protocol: a `start`
//! request returns a single-use upload URL, and the bytes are sent to it
//! with `upload, finalize`. Every call to [`Client::upload_to_store`] opens
//! a new upload URL.

use std::path::Path;
use std::time::Duration;

use filestore_protocol::constants::{is_retryable_message, is_terminated_upload_message};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::mime::mime_type_for;
use crate::types::{
    Document, FileSearchStore, ListDocumentsResponse, ListStoresResponse, Operation,
    UploadMetadata,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const PAGE_SIZE: &str = "20";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors from the file-search client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid API key")]
    InvalidKey,

    #[error("upload start response carried no upload URL")]
    MissingUploadUrl,

    #[error("operation failed: {0}")]
    OperationFailed(String),

    #[error("operation timed out after {0:?}")]
    OperationTimeout(Duration),
}

impl Error {
    /// Whether retrying the same request may succeed: transport failures,
    /// 408/429/5xx responses and messages matching the retryable patterns.
    ///
    /// Once an import operation exists the file has been accepted, so a
    /// poll timeout is final and a failed operation is retried only when
    /// the upload session was terminated.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_builder() && !e.is_decode(),
            Error::Api { status, body } => {
                matches!(status, 408 | 429 | 500..=599) || is_retryable_message(body)
            }
            Error::MissingUploadUrl => true,
            Error::OperationFailed(message) => is_terminated_upload_message(message),
            Error::OperationTimeout(_) | Error::Json(_) | Error::Io(_) | Error::InvalidKey => {
                false
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// The service refused because of resource state, e.g. deleting a
    /// store that still has documents without `force`.
    pub fn is_failed_precondition(&self) -> bool {
        match self {
            Error::Api { status, body } => {
                matches!(status, 400 | 409 | 412)
                    && (body.contains("FAILED_PRECONDITION") || body.contains("not empty"))
            }
            _ => false,
        }
    }
}

/// File-search API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl Client {
    /// Creates a new client with the given API key.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        if api_key.trim().is_empty() {
            return Err(Error::InvalidKey);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key).map_err(|_| Error::InvalidKey)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Overrides how often and how long upload operations are polled.
    pub fn with_operation_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.operation_timeout = timeout;
        self
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/{API_VERSION}/{resource}", self.base_url)
    }

    async fn check(resp: Response) -> Result<Response, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, Error> {
        let resp = Self::check(req.send().await?).await?;
        let body = resp.bytes().await?;
        trace!(bytes = body.len(), "response received");
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_empty(&self, req: RequestBuilder) -> Result<(), Error> {
        Self::check(req.send().await?).await?;
        Ok(())
    }

    /// Creates a store.
    pub async fn create_store(&self, display_name: Option<&str>) -> Result<FileSearchStore, Error> {
        let body = match display_name {
            Some(name) => serde_json::json!({ "displayName": name }),
            None => serde_json::json!({}),
        };
        let store: FileSearchStore = self
            .send_json(self.http.post(self.api_url("fileSearchStores")).json(&body))
            .await?;
        debug!(store = %store.name, "store created");
        Ok(store)
    }

    /// Lists every store, following pagination.
    pub async fn list_stores(&self) -> Result<Vec<FileSearchStore>, Error> {
        let mut stores = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }
            let page: ListStoresResponse = self
                .send_json(self.http.get(self.api_url("fileSearchStores")).query(&params))
                .await?;
            stores.extend(page.file_search_stores);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(stores)
    }

    /// Returns a store by resource name (`fileSearchStores/...`).
    pub async fn get_store(&self, name: &str) -> Result<FileSearchStore, Error> {
        self.send_json(self.http.get(self.api_url(name))).await
    }

    /// Deletes a store. `force` also deletes its documents.
    pub async fn delete_store(&self, name: &str, force: bool) -> Result<(), Error> {
        let req = self
            .http
            .delete(self.api_url(name))
            .query(&[("force", force.to_string())]);
        self.send_empty(req).await?;
        debug!(store = %name, force, "store deleted");
        Ok(())
    }

    /// Lists every document in a store, following pagination.
    pub async fn list_documents(&self, store: &str) -> Result<Vec<Document>, Error> {
        let url = self.api_url(&format!("{store}/documents"));
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }
            let page: ListDocumentsResponse =
                self.send_json(self.http.get(&url).query(&params)).await?;
            documents.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(documents)
    }

    /// Returns a document by resource name.
    pub async fn get_document(&self, name: &str) -> Result<Document, Error> {
        self.send_json(self.http.get(self.api_url(name))).await
    }

    /// Deletes a document. `force` also deletes its chunks.
    pub async fn delete_document(&self, name: &str, force: bool) -> Result<(), Error> {
        let req = self
            .http
            .delete(self.api_url(name))
            .query(&[("force", force.to_string())]);
        self.send_empty(req).await?;
        debug!(document = %name, force, "document deleted");
        Ok(())
    }

    /// Fetches the current state of a long-running operation.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, Error> {
        self.send_json(self.http.get(self.api_url(name))).await
    }

    /// Polls `op` until it is done.
    ///
    /// Fails with [`Error::OperationTimeout`] after the configured timeout
    /// and with [`Error::OperationFailed`] if the operation reports an error.
    pub async fn wait_for_operation(&self, mut op: Operation) -> Result<Operation, Error> {
        let start = tokio::time::Instant::now();
        while !op.done {
            if start.elapsed() > self.operation_timeout {
                return Err(Error::OperationTimeout(self.operation_timeout));
            }
            tokio::time::sleep(self.poll_interval).await;
            op = self.get_operation(&op.name).await?;
            trace!(operation = %op.name, done = op.done, "operation polled");
        }

        if let Some(status) = &op.error {
            return Err(Error::OperationFailed(format!(
                "{} (code {})",
                status.message, status.code
            )));
        }
        Ok(op)
    }

    /// Uploads a file into a store and returns the import operation.
    ///
    /// Opens a new resumable upload session on every call.
    pub async fn upload_to_store(
        &self,
        store: &str,
        path: &Path,
        metadata: &UploadMetadata,
    ) -> Result<Operation, Error> {
        let data = tokio::fs::read(path).await?;
        let mime = metadata
            .mime_type
            .as_deref()
            .unwrap_or_else(|| mime_type_for(path));

        let start_url = format!(
            "{}/upload/{API_VERSION}/{store}:uploadToFileSearchStore",
            self.base_url
        );
        let start = self
            .http
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime)
            .json(metadata)
            .send()
            .await?;
        let start = Self::check(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(Error::MissingUploadUrl)?;
        debug!(path = %path.display(), bytes = data.len(), "upload session opened");

        let finalize = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(data);
        self.send_json(finalize).await
    }

    /// Uploads a file, waits for indexing to finish, and returns the new
    /// document's resource name.
    pub async fn upload_document(
        &self,
        store: &str,
        path: &Path,
        metadata: &UploadMetadata,
    ) -> Result<String, Error> {
        let op = self.upload_to_store(store, path, metadata).await?;
        let op = self.wait_for_operation(op).await?;
        op.document_name().map(str::to_string).ok_or_else(|| {
            Error::OperationFailed("operation finished without a document name".into())
        })
    }
}
