//! The tqwp engine: spawns the worker tasks and joins them on shutdown.

use crate::core::worker::{Worker, WorkerContext};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Owns the handles of the running workers
pub(crate) struct PoolEngine {
    handles: Vec<JoinHandle<u64>>,
}

impl PoolEngine {
    /// Spawn `num_workers` workers sharing `context`.
    pub fn start(num_workers: usize, context: Arc<WorkerContext>) -> Self {
        let handles = (0..num_workers)
            .map(|worker_id| tokio::spawn(Worker::new(worker_id, Arc::clone(&context)).run()))
            .collect();

        tracing::info!(num_workers, "Engine started");
        Self { handles }
    }

    /// Number of workers spawned
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit.
    ///
    /// Workers only exit once the queue is closed and empty, so the queue must
    /// be closed before calling this. Returns the total number of attempts the
    /// workers executed.
    pub async fn join(self) -> u64 {
        let worker_count = self.handles.len();
        let mut executed = 0u64;
        let mut errors = 0usize;

        for (worker_id, result) in join_all(self.handles).await.into_iter().enumerate() {
            match result {
                Ok(count) => executed += count,
                Err(join_error) => {
                    errors += 1;
                    tracing::error!(worker_id, error = %join_error, "Worker terminated abnormally");
                }
            }
        }

        tracing::info!(worker_count, executed, errors, "Engine stopped");
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::core::counters::PoolCounters;
    use crate::logging::NoopLogger;
    use crate::queue::{BoundedQueue, QueueBackend};
    use std::time::Duration;

    #[tokio::test]
    async fn test_engine_joins_after_close() {
        let queue: Arc<dyn QueueBackend> =
            Arc::new(BoundedQueue::with_config(QueueConfig::with_capacity(2)));
        let context = Arc::new(WorkerContext {
            queue: Arc::clone(&queue),
            counters: Arc::new(PoolCounters::default()),
            logger: Arc::new(NoopLogger),
            max_retries: 0,
        });

        let engine = PoolEngine::start(3, context);
        assert_eq!(engine.worker_count(), 3);

        queue.close().await;
        let executed = tokio::time::timeout(Duration::from_secs(1), engine.join())
            .await
            .expect("workers should exit once the queue is closed");
        assert_eq!(executed, 0);
    }
}
