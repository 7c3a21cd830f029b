//! Background summarization worker.
//!
//! The HTTP layer never runs summarization inline. Instead, the create
//! handler pushes a [`SummaryJob`] onto a bounded in-process queue and the
//! worker consumes jobs one at a time, updating each record's status as it
//! goes. This keeps completion, failure, and shutdown draining observable
//! and testable without going through the HTTP layer.
//!
//! Per job: mark `processing`, run the summarizer under a timeout, retry a
//! bounded number of attempts, then mark `completed` (with the text) or
//! `failed` (with a failure note). Summarization errors never propagate
//! past the worker; they are only visible in the record's state.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::crud;
use crate::summarizer::Summarizer;

/// Pause between retry attempts for one job.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// One unit of background work: summarize `url` into record `id`.
#[derive(Debug, Clone)]
pub struct SummaryJob {
    pub id: i64,
    pub url: String,
}

/// Producer half of the job queue. Cheap to clone; held in server state.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<SummaryJob>,
}

impl JobQueue {
    /// Enqueue without blocking the request path. Returns false when the
    /// queue is full or the worker has shut down; the caller decides what
    /// to do with the record in that case.
    pub fn enqueue(&self, job: SummaryJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(id = job.id, "summarization queue full, dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::error!(id = job.id, "summarization worker is gone, dropping job");
                false
            }
        }
    }
}

/// Handle to the running worker task.
pub struct WorkerHandle {
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Wait for the worker to drain remaining jobs and exit.
    ///
    /// The worker exits once every [`JobQueue`] clone has been dropped and
    /// the channel is empty, so callers must release their queue handles
    /// before awaiting this.
    pub async fn drained(self) {
        let _ = self.join.await;
    }
}

/// Start the worker task and return the queue producer plus its handle.
pub fn spawn(
    pool: SqlitePool,
    summarizer: Arc<dyn Summarizer>,
    config: &WorkerConfig,
) -> (JobQueue, WorkerHandle) {
    let (tx, mut rx) = mpsc::channel::<SummaryJob>(config.queue_capacity);
    let config = config.clone();

    let join = tokio::spawn(async move {
        tracing::info!(provider = summarizer.name(), "summarization worker started");

        while let Some(job) = rx.recv().await {
            process_job(&pool, summarizer.as_ref(), &config, &job).await;
        }

        tracing::info!("summarization worker drained, exiting");
    });

    (JobQueue { tx }, WorkerHandle { join })
}

/// Run one job to a terminal state. Database errors are logged and
/// swallowed so a flaky connection cannot kill the worker loop.
async fn process_job(
    pool: &SqlitePool,
    summarizer: &dyn Summarizer,
    config: &WorkerConfig,
    job: &SummaryJob,
) {
    tracing::info!(id = job.id, url = %job.url, "starting summarization");

    match crud::mark_processing(pool, job.id).await {
        Ok(true) => {}
        Ok(false) => {
            // Record deleted between enqueue and pickup.
            tracing::warn!(id = job.id, "record no longer exists, skipping job");
            return;
        }
        Err(e) => {
            tracing::error!(id = job.id, error = %e, "failed to mark record processing");
            return;
        }
    }

    let job_timeout = Duration::from_secs(config.job_timeout_secs);
    let mut last_err = String::new();

    for attempt in 1..=config.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(RETRY_DELAY).await;
            tracing::info!(id = job.id, attempt, "retrying summarization");
        }

        match tokio::time::timeout(job_timeout, summarizer.summarize(&job.url)).await {
            Ok(Ok(text)) => {
                match crud::complete_summary(pool, job.id, &text).await {
                    Ok(_) => tracing::info!(id = job.id, "summarization completed"),
                    Err(e) => {
                        tracing::error!(id = job.id, error = %e, "failed to store summary")
                    }
                }
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(id = job.id, attempt, error = %e, "summarization attempt failed");
                last_err = e.to_string();
            }
            Err(_) => {
                tracing::warn!(
                    id = job.id,
                    attempt,
                    "summarization attempt timed out after {}s",
                    config.job_timeout_secs
                );
                last_err = format!("timed out after {}s", config.job_timeout_secs);
            }
        }
    }

    let note = format!("Failed to generate summary: {}", last_err);
    if let Err(e) = crud::fail_summary(pool, job.id, &note).await {
        tracing::error!(id = job.id, error = %e, "failed to mark record failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use crate::models::SummaryStatus;
    use crate::summarizer::{MockSummarizer, MOCK_SUMMARY_TEXT};
    use anyhow::Result;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Provider that always fails, for exercising the failure path.
    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn summarize(&self, _url: &str) -> Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    /// Provider that never returns, for exercising the timeout path.
    struct HangingSummarizer;

    #[async_trait]
    impl Summarizer for HangingSummarizer {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn summarize(&self, _url: &str) -> Result<String> {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        }
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();
        pool
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            queue_capacity: 8,
            job_timeout_secs: 1,
            max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn test_worker_completes_job_with_mock() {
        let pool = test_pool().await;
        let record = crud::create_summary(&pool, "https://example.com/").await.unwrap();

        let (queue, handle) = spawn(pool.clone(), Arc::new(MockSummarizer), &fast_config());
        assert!(queue.enqueue(SummaryJob {
            id: record.id,
            url: record.url.clone(),
        }));

        drop(queue);
        handle.drained().await;

        let row = crud::get_summary(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(row.status, SummaryStatus::Completed);
        assert_eq!(row.summary, MOCK_SUMMARY_TEXT);
    }

    #[tokio::test]
    async fn test_worker_marks_failed_after_exhausted_attempts() {
        let pool = test_pool().await;
        let record = crud::create_summary(&pool, "https://example.com/").await.unwrap();

        let (queue, handle) = spawn(pool.clone(), Arc::new(FailingSummarizer), &fast_config());
        queue.enqueue(SummaryJob {
            id: record.id,
            url: record.url.clone(),
        });

        drop(queue);
        handle.drained().await;

        let row = crud::get_summary(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(row.status, SummaryStatus::Failed);
        assert!(row.summary.contains("Failed to generate summary"));
        assert!(row.summary.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_worker_times_out_hung_provider() {
        let pool = test_pool().await;
        let record = crud::create_summary(&pool, "https://example.com/").await.unwrap();

        let config = WorkerConfig {
            queue_capacity: 8,
            job_timeout_secs: 1,
            max_attempts: 1,
        };

        let (queue, handle) = spawn(pool.clone(), Arc::new(HangingSummarizer), &config);
        queue.enqueue(SummaryJob {
            id: record.id,
            url: record.url.clone(),
        });

        drop(queue);
        handle.drained().await;

        let row = crud::get_summary(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(row.status, SummaryStatus::Failed);
        assert!(row.summary.contains("timed out"));
    }

    #[tokio::test]
    async fn test_worker_skips_deleted_record() {
        let pool = test_pool().await;
        let record = crud::create_summary(&pool, "https://example.com/").await.unwrap();
        crud::delete_summary(&pool, record.id).await.unwrap();

        let (queue, handle) = spawn(pool.clone(), Arc::new(MockSummarizer), &fast_config());
        queue.enqueue(SummaryJob {
            id: record.id,
            url: record.url.clone(),
        });

        drop(queue);
        handle.drained().await;

        assert!(crud::get_summary(&pool, record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_jobs() {
        let pool = test_pool().await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let record = crud::create_summary(&pool, &format!("https://example.com/{}", i))
                .await
                .unwrap();
            ids.push(record.id);
        }

        let (queue, handle) = spawn(pool.clone(), Arc::new(MockSummarizer), &fast_config());
        for (&id, i) in ids.iter().zip(0..) {
            queue.enqueue(SummaryJob {
                id,
                url: format!("https://example.com/{}", i),
            });
        }

        drop(queue);
        handle.drained().await;

        for id in ids {
            let row = crud::get_summary(&pool, id).await.unwrap().unwrap();
            assert_eq!(row.status, SummaryStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_enqueue_reports_full_queue() {
        let pool = test_pool().await;

        let first = crud::create_summary(&pool, "https://example.com/a").await.unwrap();
        let second = crud::create_summary(&pool, "https://example.com/b").await.unwrap();
        let third = crud::create_summary(&pool, "https://example.com/c").await.unwrap();

        // Hanging provider keeps the worker busy while the queue fills.
        let config = WorkerConfig {
            queue_capacity: 1,
            job_timeout_secs: 30,
            max_attempts: 1,
        };
        let (queue, handle) = spawn(pool.clone(), Arc::new(HangingSummarizer), &config);

        queue.enqueue(SummaryJob {
            id: first.id,
            url: first.url.clone(),
        });

        // Wait until the worker has picked up the first job and is hanging.
        for _ in 0..50 {
            let row = crud::get_summary(&pool, first.id).await.unwrap().unwrap();
            if row.status == SummaryStatus::Processing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // Second job occupies the single buffer slot, third must be rejected.
        assert!(queue.enqueue(SummaryJob {
            id: second.id,
            url: second.url.clone(),
        }));
        let accepted = queue.enqueue(SummaryJob {
            id: third.id,
            url: third.url.clone(),
        });
        assert!(!accepted);

        handle.join.abort();
        drop(queue);
    }
}
