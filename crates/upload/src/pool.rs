//! Bounded-concurrency execution of upload sessions.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::session::{CANCELLED, SessionContext, UploadSession};
use crate::types::{FileTask, SessionOutcome};

/// Runs up to `concurrency` sessions at once, starting queued tasks in
/// order as slots free up.
pub struct UploadWorkerPool {
    concurrency: usize,
    cancel: CancellationToken,
}

impl UploadWorkerPool {
    /// `concurrency` is clamped to at least 1.
    pub fn new(concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel,
        }
    }

    /// Runs every task to a terminal state and returns one outcome per task.
    ///
    /// After cancellation no further task is started; tasks still queued
    /// are finalized as failed with reason "cancelled". Sessions already
    /// running stop at their next retry checkpoint.
    pub async fn run(&self, tasks: Vec<FileTask>, ctx: Arc<SessionContext>) -> Vec<SessionOutcome> {
        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut running = Vec::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);
        let mut queue = tasks.into_iter();

        for task in queue.by_ref() {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                outcomes.push(UploadSession::new(task, Arc::clone(&ctx)).abort(CANCELLED).await);
                break;
            };

            debug!(path = %task.path.display(), "dispatching upload");
            let session = UploadSession::new(task.clone(), Arc::clone(&ctx));
            let handle = tokio::spawn(async move {
                let _permit = permit;
                session.run().await
            });
            running.push((task, handle));
        }

        let never_started: Vec<FileTask> = queue.collect();
        if !never_started.is_empty() {
            info!(count = never_started.len(), "upload cancelled, skipping queued files");
        }
        for task in never_started {
            outcomes.push(UploadSession::new(task, Arc::clone(&ctx)).abort(CANCELLED).await);
        }

        for (task, handle) in running {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(path = %task.path.display(), error = %e, "upload worker panicked");
                    outcomes.push(
                        UploadSession::new(task, Arc::clone(&ctx))
                            .abort(format!("worker panicked: {e}"))
                            .await,
                    );
                }
            }
        }

        debug_assert_eq!(outcomes.len(), total);
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockStore, test_context, test_task};
    use crate::types::TerminalStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn respects_concurrency_limit() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new()).with_delay(Duration::from_millis(100));
        let (ctx, _rx) = test_context(store.clone(), dir.path());

        let tasks = (0..7).map(|i| test_task(&format!("f{i}.txt"), 10)).collect();
        let pool = UploadWorkerPool::new(2, CancellationToken::new());
        let outcomes = pool.run(tasks, ctx).await;

        assert_eq!(outcomes.len(), 7);
        assert!(outcomes.iter().all(|o| o.terminal.is_success()));
        assert_eq!(store.max_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn starts_tasks_in_queue_order() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new()).with_delay(Duration::from_millis(10));
        let (ctx, _rx) = test_context(store.clone(), dir.path());

        let names = ["1.txt", "2.txt", "3.txt", "4.txt"];
        let tasks = names.iter().map(|n| test_task(n, 10)).collect();
        UploadWorkerPool::new(1, CancellationToken::new())
            .run(tasks, ctx)
            .await;

        let order: Vec<String> = store
            .requests()
            .iter()
            .map(|r| r.display_name.clone())
            .collect();
        assert_eq!(order, names);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_fails_queued_tasks() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new()).with_delay(Duration::from_secs(10));
        let (ctx, _rx) = test_context(store.clone(), dir.path());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let tasks = (0..4).map(|i| test_task(&format!("q{i}.txt"), 10)).collect();
        let outcomes = UploadWorkerPool::new(1, cancel).run(tasks, Arc::clone(&ctx)).await;

        // The in-flight upload is not interrupted mid-call.
        assert_eq!(store.calls(), 1);
        let succeeded = outcomes.iter().filter(|o| o.terminal.is_success()).count();
        let cancelled = outcomes
            .iter()
            .filter(|o| {
                o.terminal
                    == TerminalStatus::Failed {
                        error: CANCELLED.into(),
                    }
            })
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(cancelled, 3);
        assert_eq!(ctx.failure_log.read_all().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let dir = TempDir::new().unwrap();
        let store = MockStore::scripted(Vec::new());
        let (ctx, _rx) = test_context(store.clone(), dir.path());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let tasks = (0..3).map(|i| test_task(&format!("c{i}.txt"), 10)).collect();
        let outcomes = UploadWorkerPool::new(2, cancel).run(tasks, ctx).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| !o.terminal.is_success()));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn empty_queue() {
        let dir = TempDir::new().unwrap();
        let (ctx, _rx) = test_context(MockStore::scripted(Vec::new()), dir.path());
        let outcomes = UploadWorkerPool::new(3, CancellationToken::new())
            .run(Vec::new(), ctx)
            .await;
        assert!(outcomes.is_empty());
    }
}
