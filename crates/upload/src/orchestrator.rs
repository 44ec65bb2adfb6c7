//! Batch upload coordinator.
//!
//! Deduplicates the input, builds one [`FileTask`] per surviving file,
//! runs them through the worker pool and sorts the outcomes into a
//! [`BatchResult`].

use std::sync::{Arc, Mutex, PoisonError};

use filestore_metadata::MetadataExtractor;
use filestore_protocol::constants::DEFAULT_MAX_FILE_SIZE_MB;
use filestore_protocol::{ChunkConfig, CustomMetadata};
use filestore_transfer::{ResolvedFile, mb_to_bytes};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dedup;
use crate::error::UploadError;
use crate::failure_log::FailureLog;
use crate::pool::UploadWorkerPool;
use crate::progress::{ProgressAggregator, ProgressCallback};
use crate::retry::RetryPolicy;
use crate::session::SessionContext;
use crate::settings::UploadSettings;
use crate::store::StoreService;
use crate::types::{BatchResult, DuplicatePolicy, FileTask, TerminalStatus};

/// Uploads batches of files into a store.
pub struct UploadOrchestrator {
    store: Arc<dyn StoreService>,
    extractor: Arc<dyn MetadataExtractor>,
    failure_log: Arc<FailureLog>,
    retry: RetryPolicy,
    max_file_size_bytes: u64,
    duplicate_policy: DuplicatePolicy,
    custom_metadata: Option<Vec<CustomMetadata>>,
    progress: ProgressAggregator,
    cancel: Mutex<CancellationToken>,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn StoreService>,
        extractor: Arc<dyn MetadataExtractor>,
        failure_log: Arc<FailureLog>,
    ) -> Self {
        Self {
            store,
            extractor,
            failure_log,
            retry: RetryPolicy::default(),
            max_file_size_bytes: mb_to_bytes(DEFAULT_MAX_FILE_SIZE_MB),
            duplicate_policy: DuplicatePolicy::default(),
            custom_metadata: None,
            progress: ProgressAggregator::new(),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Builds an orchestrator from validated settings. The failure log is
    /// opened at `settings.failure_log_path`.
    pub fn from_settings(
        settings: &UploadSettings,
        store: Arc<dyn StoreService>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self, UploadError> {
        settings.validate()?;
        let failure_log = Arc::new(FailureLog::new(&settings.failure_log_path));
        Ok(Self::new(store, extractor, failure_log)
            .with_retry_policy(settings.retry_policy())
            .with_max_file_size(settings.max_file_size_bytes()))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Attaches `metadata` to every document instead of extracting it.
    pub fn with_custom_metadata(mut self, metadata: Vec<CustomMetadata>) -> Self {
        self.custom_metadata = Some(metadata);
        self
    }

    /// Returns a cancellation token for the running batch, or for the next
    /// one if none is running.
    ///
    /// A batch that ends cancelled retires its token, so later batches start
    /// with a fresh one.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn retire_cancelled_token(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    /// Live progress of the current (or last) batch.
    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn failure_log(&self) -> &Arc<FailureLog> {
        &self.failure_log
    }

    /// Uploads `files` into `store_id` with up to `concurrency` sessions.
    ///
    /// Fails only when nothing can be dispatched: an empty batch, zero
    /// concurrency or an invalid chunk configuration. Everything else is
    /// reported per file in the returned [`BatchResult`].
    pub async fn upload_batch(
        &self,
        files: Vec<ResolvedFile>,
        store_id: &str,
        chunk_config: ChunkConfig,
        concurrency: usize,
        on_progress: Option<ProgressCallback>,
    ) -> Result<BatchResult, UploadError> {
        if files.is_empty() {
            return Err(UploadError::EmptyBatch);
        }
        if concurrency == 0 {
            return Err(UploadError::InvalidConcurrency(concurrency));
        }
        chunk_config.validate()?;

        let input_count = files.len();
        let (to_upload, skipped_duplicates) = dedup::partition(files, self.duplicate_policy);
        for path in &skipped_duplicates {
            info!(path = %path.display(), "skipping duplicate");
        }

        let tasks: Vec<FileTask> = to_upload
            .into_iter()
            .map(|f| FileTask {
                path: f.path,
                size_bytes: f.size_bytes,
                fingerprint: f.fingerprint,
                store_id: store_id.to_string(),
                chunk_config,
            })
            .collect();

        info!(
            store = %store_id,
            files = tasks.len(),
            duplicates = skipped_duplicates.len(),
            concurrency,
            "upload batch started"
        );

        self.progress.reset(tasks.iter().map(|t| t.path.clone()));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let listener = self.progress.spawn(events_rx, on_progress);

        let cancel = self.cancel_token();
        let ctx = Arc::new(SessionContext {
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            failure_log: Arc::clone(&self.failure_log),
            retry: self.retry,
            max_file_size_bytes: self.max_file_size_bytes,
            custom_metadata: self.custom_metadata.clone(),
            events: events_tx,
            cancel: cancel.clone(),
        });

        let pool = UploadWorkerPool::new(concurrency, cancel);
        let outcomes = pool.run(tasks, ctx).await;
        self.retire_cancelled_token();

        // All senders are gone once the pool returns; the listener drains
        // what is left and exits.
        if let Err(e) = listener.await {
            warn!(error = %e, "progress listener stopped abnormally");
        }

        let mut result = BatchResult {
            skipped_duplicates,
            ..BatchResult::default()
        };
        for outcome in outcomes {
            let path = outcome.state.task.path;
            match outcome.terminal {
                TerminalStatus::Succeeded { .. } => result.succeeded.push(path),
                TerminalStatus::Failed { error } => result.failed.push((path, error)),
            }
        }
        debug_assert_eq!(result.total(), input_count);

        info!(
            store = %store_id,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            duplicates = result.skipped_duplicates.len(),
            "upload batch finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::progress::ProgressSnapshot;
    use crate::test_support::MockStore;
    use filestore_metadata::FileMetadataExtractor;
    use filestore_transfer::Fingerprint;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn resolved(name: &str, hash: &str) -> ResolvedFile {
        ResolvedFile {
            path: PathBuf::from("/batch").join(name),
            size_bytes: 42,
            fingerprint: Fingerprint::Sha256(hash.into()),
        }
    }

    fn orchestrator(store: Arc<MockStore>, dir: &TempDir) -> UploadOrchestrator {
        UploadOrchestrator::new(
            store,
            Arc::new(FileMetadataExtractor::new()),
            Arc::new(FailureLog::new(dir.path().join("failures.jsonl"))),
        )
    }

    #[tokio::test]
    async fn five_files_two_identical() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new());
        let orch = orchestrator(store.clone(), &dir);

        let files = vec![
            resolved("a.txt", "h1"),
            resolved("b.txt", "h2"),
            resolved("c.txt", "h3"),
            resolved("a-copy.txt", "h1"),
            resolved("d.txt", "h4"),
        ];
        let result = orch
            .upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 3, None)
            .await
            .unwrap();

        assert_eq!(result.succeeded.len(), 4);
        assert_eq!(result.skipped_duplicates, vec![PathBuf::from("/batch/a-copy.txt")]);
        assert!(result.failed.is_empty());
        assert_eq!(result.total(), 5);
        assert_eq!(store.calls(), 4);
    }

    #[tokio::test]
    async fn upload_all_ignores_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new());
        let orch = orchestrator(store.clone(), &dir).with_duplicate_policy(DuplicatePolicy::UploadAll);

        let files = vec![resolved("a.txt", "h1"), resolved("b.txt", "h1")];
        let result = orch
            .upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 2, None)
            .await
            .unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert!(result.skipped_duplicates.is_empty());
    }

    #[tokio::test]
    async fn same_path_twice_uploads_once() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new()).with_delay(Duration::from_millis(20));
        let orch = orchestrator(store.clone(), &dir).with_duplicate_policy(DuplicatePolicy::UploadAll);

        let files = vec![resolved("a.txt", "h1"), resolved("a.txt", "h1")];
        let result = orch
            .upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 2, None)
            .await
            .unwrap();

        assert_eq!(store.calls(), 1);
        assert_eq!(store.max_in_flight(), 1);
        assert_eq!(result.succeeded, vec![PathBuf::from("/batch/a.txt")]);
        assert_eq!(result.skipped_duplicates, vec![PathBuf::from("/batch/a.txt")]);
        assert_eq!(result.total(), 2);
        assert_eq!(orch.progress().snapshot().total_count, 1);
    }

    #[tokio::test]
    async fn rejects_invalid_chunk_config_before_dispatch() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new());
        let orch = orchestrator(store.clone(), &dir);

        let bad = ChunkConfig {
            max_tokens_per_chunk: 100,
            max_overlap_tokens: 150,
        };
        let err = orch
            .upload_batch(vec![resolved("a.txt", "h1")], "fileSearchStores/s", bad, 2, None)
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidChunkConfig(_)));
        assert_eq!(store.calls(), 0);
        assert!(orch.failure_log().read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_batch_and_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MockStore::scripted(Vec::new()), &dir);

        let empty = orch
            .upload_batch(Vec::new(), "s", ChunkConfig::default(), 1, None)
            .await;
        assert!(matches!(empty, Err(UploadError::EmptyBatch)));

        let zero = orch
            .upload_batch(vec![resolved("a.txt", "h1")], "s", ChunkConfig::default(), 0, None)
            .await;
        assert!(matches!(zero, Err(UploadError::InvalidConcurrency(0))));
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_outcomes_one_failure_record_each() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(vec![
            Err(StoreError::NonRetryable("invalid file".into())),
            Err(StoreError::Transient("503".into())),
        ]);
        let orch = orchestrator(store.clone(), &dir).with_retry_policy(RetryPolicy {
            max_retries: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
        });

        let files = vec![resolved("a.txt", "h1"), resolved("b.txt", "h2")];
        let result = orch
            .upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 1, None)
            .await
            .unwrap();

        // a: non-retryable. b: one transient error, then success.
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].0, PathBuf::from("/batch/a.txt"));
        assert_eq!(result.succeeded, vec![PathBuf::from("/batch/b.txt")]);

        let records = orch.failure_log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].store_id, "fileSearchStores/s");
        assert_eq!(records[0].error_message, "invalid file");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_batch() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new()).with_delay(Duration::from_secs(5));
        let orch = orchestrator(store.clone(), &dir);

        let token = orch.cancel_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let files = (0..6)
            .map(|i| resolved(&format!("{i}.txt"), &format!("h{i}")))
            .collect();
        let result = orch
            .upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 2, None)
            .await
            .unwrap();

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 4);
        assert!(result.failed.iter().all(|(_, e)| e == "cancelled"));
        assert_eq!(store.calls(), 2);
        assert_eq!(orch.failure_log().read_all().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn next_batch_runs_after_cancelled_one() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new());
        let orch = orchestrator(store.clone(), &dir);

        orch.cancel_token().cancel();
        let first = orch
            .upload_batch(
                vec![resolved("a.txt", "h1")],
                "fileSearchStores/s",
                ChunkConfig::default(),
                1,
                None,
            )
            .await
            .unwrap();
        assert_eq!(first.failed.len(), 1);
        assert_eq!(store.calls(), 0);

        assert!(!orch.cancel_token().is_cancelled());
        let second = orch
            .upload_batch(
                vec![resolved("b.txt", "h2")],
                "fileSearchStores/s",
                ChunkConfig::default(),
                1,
                None,
            )
            .await
            .unwrap();
        assert_eq!(second.succeeded, vec![PathBuf::from("/batch/b.txt")]);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn progress_callback_sees_completion() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(MockStore::scripted(Vec::new()), &dir);

        let snapshots: Arc<Mutex<Vec<ProgressSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);
        let callback: ProgressCallback =
            Box::new(move |snap: &ProgressSnapshot| sink.lock().unwrap().push(snap.clone()));

        let files = vec![resolved("a.txt", "h1"), resolved("b.txt", "h2")];
        orch.upload_batch(files, "fileSearchStores/s", ChunkConfig::default(), 2, Some(callback))
            .await
            .unwrap();

        let snapshots = snapshots.lock().unwrap();
        let last = snapshots.last().unwrap();
        assert_eq!(last.total_count, 2);
        assert_eq!(last.completed_count, 2);
        assert_eq!(last.succeeded, 2);
        assert!(snapshots.iter().all(|s| s.in_progress <= 2));
        assert!(orch.progress().snapshot().is_complete());
    }

    #[tokio::test]
    async fn from_settings_validates() {
        let dir = TempDir::new().unwrap();
        let settings = UploadSettings {
            concurrency_limit: 0,
            failure_log_path: dir.path().join("f.jsonl"),
            ..UploadSettings::default()
        };
        let result = UploadOrchestrator::from_settings(
            &settings,
            MockStore::scripted(Vec::new()),
            Arc::new(FileMetadataExtractor::new()),
        );
        assert!(result.is_err());
    }
}
