use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filestore_metadata::FileMetadataExtractor;
use filestore_protocol::{ChunkConfig, DocumentDetail, DocumentSummary, StoreDetail, StoreSummary};
use filestore_transfer::{Fingerprint, mb_to_bytes};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::failure_log::FailureLog;
use crate::retry::RetryPolicy;
use crate::session::SessionContext;
use crate::store::{StoreFuture, StoreService, UploadRequest};
use crate::types::{FileTask, ProgressEvent};

/// Store double with scripted upload outcomes and concurrency tracking.
pub(crate) struct MockStore {
    script: Mutex<VecDeque<Result<(), StoreError>>>,
    fallback: Result<(), StoreError>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<UploadRequest>>,
}

impl MockStore {
    fn build(script: Vec<Result<(), StoreError>>, fallback: Result<(), StoreError>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Plays `script` in order, then succeeds.
    pub fn scripted(script: Vec<Result<(), StoreError>>) -> Arc<Self> {
        Self::build(script, Ok(()))
    }

    /// Every upload returns `outcome`.
    pub fn always(outcome: Result<(), StoreError>) -> Arc<Self> {
        Self::build(Vec::new(), outcome)
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UploadRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl StoreService for MockStore {
    fn create_store(&self, _display_name: Option<&str>) -> StoreFuture<'_, String> {
        Box::pin(async { Ok("fileSearchStores/mock".to_string()) })
    }

    fn list_stores(&self) -> StoreFuture<'_, Vec<StoreSummary>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn get_store(&self, store_id: &str) -> StoreFuture<'_, StoreDetail> {
        let id = store_id.to_string();
        Box::pin(async move { Err(StoreError::NotFound(id)) })
    }

    fn delete_store(&self, _store_id: &str, _force: bool) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn upload_document(&self, request: UploadRequest) -> StoreFuture<'_, String> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let name = request.display_name.clone();
            self.requests.lock().unwrap().push(request);

            let delay = *self.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome.map(|()| format!("fileSearchStores/mock/documents/{name}"))
        })
    }

    fn list_documents(&self, _store_id: &str) -> StoreFuture<'_, Vec<DocumentSummary>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn get_document(&self, document_id: &str) -> StoreFuture<'_, DocumentDetail> {
        let id = document_id.to_string();
        Box::pin(async move { Err(StoreError::NotFound(id)) })
    }

    fn delete_document(&self, _document_id: &str, _force: bool) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

pub(crate) fn test_context(
    store: Arc<MockStore>,
    dir: &Path,
) -> (Arc<SessionContext>, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (events, rx) = mpsc::unbounded_channel();
    let ctx = SessionContext {
        store,
        extractor: Arc::new(FileMetadataExtractor::new()),
        failure_log: Arc::new(FailureLog::new(dir.join("failures.jsonl"))),
        retry: RetryPolicy::default(),
        max_file_size_bytes: mb_to_bytes(100),
        custom_metadata: None,
        events,
        cancel: CancellationToken::new(),
    };
    (Arc::new(ctx), rx)
}

pub(crate) fn test_task(name: &str, size_bytes: u64) -> FileTask {
    FileTask {
        path: PathBuf::from("/data").join(name),
        size_bytes,
        fingerprint: Fingerprint::Sha256(format!("hash-of-{name}")),
        store_id: "fileSearchStores/test".into(),
        chunk_config: ChunkConfig::default(),
    }
}
