//! Worker implementation for tqwp.
//!
//! A worker is a long-lived loop: dequeue one task, run it, settle the
//! outcome, repeat. It exits once the queue is closed and empty.
//!
//! Each attempt runs on its own tokio task so that a panic inside `process`
//! is contained, but the worker awaits that task before dequeuing again. The
//! number of tasks executing at once therefore never exceeds the number of
//! workers.

use crate::core::counters::PoolCounters;
use crate::error::TaskError;
use crate::logging::PoolLogger;
use crate::queue::QueueBackend;
use crate::task::{QueuedTask, TaskStatus};
use std::sync::Arc;

/// Everything a worker shares with the pool
pub(crate) struct WorkerContext {
    pub queue: Arc<dyn QueueBackend>,
    pub counters: Arc<PoolCounters>,
    pub logger: Arc<dyn PoolLogger>,
    pub max_retries: u32,
}

/// How a single attempt was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Terminal: the task completed
    Succeeded,
    /// The task went back to the queue
    Retried,
    /// Terminal: the task will not run again
    Failed,
}

/// Individual worker that processes tasks
pub(crate) struct Worker {
    id: usize,
    context: Arc<WorkerContext>,
}

impl Worker {
    /// Create a new worker with the given ID
    pub fn new(id: usize, context: Arc<WorkerContext>) -> Self {
        Self { id, context }
    }

    /// Run the worker loop until the queue is closed and drained.
    ///
    /// Returns the number of attempts this worker executed.
    pub async fn run(self) -> u64 {
        tracing::debug!(worker_id = self.id, "Worker started");

        let mut executed = 0u64;
        while let Some(queued) = self.context.queue.dequeue().await {
            executed += 1;
            let outcome = self.handle(queued).await;
            tracing::trace!(worker_id = self.id, ?outcome, "Attempt settled");
        }

        tracing::debug!(worker_id = self.id, executed, "Worker finished, queue closed");
        executed
    }

    async fn handle(&self, queued: QueuedTask) -> Outcome {
        let context = &self.context;
        let task_id = queued.id;
        let task_type = queued.task_type();

        tracing::debug!(
            worker_id = self.id,
            %task_id,
            task_type,
            attempt = queued.attempts + 1,
            "Executing task"
        );

        context.counters.begin_execution();
        let attempt = tokio::spawn(async move {
            let mut queued = queued;
            let result = queued.execute().await;
            (queued, result)
        })
        .await;
        context.counters.end_execution();

        match attempt {
            Ok((mut queued, Ok(()))) => {
                queued.status = TaskStatus::Succeeded;
                context.logger.success(&format!(
                    "Task {} ({}) completed after {} attempt(s)",
                    task_id, task_type, queued.attempts
                ));
                context.counters.record_success();
                Outcome::Succeeded
            }
            Ok((queued, Err(error))) => self.handle_failure(queued, error).await,
            Err(join_error) => {
                tracing::error!(
                    worker_id = self.id,
                    %task_id,
                    error = %join_error,
                    "Task panicked"
                );
                context.logger.error(&format!(
                    "Task {} ({}) panicked and will not be retried: {}",
                    task_id, task_type, join_error
                ));
                context.counters.record_failure();
                Outcome::Failed
            }
        }
    }

    async fn handle_failure(&self, mut queued: QueuedTask, error: TaskError) -> Outcome {
        let context = &self.context;
        let task_id = queued.id;
        let task_type = queued.task_type();

        context.logger.warn(&format!(
            "Task {} ({}) failed on attempt {}: {}",
            task_id, task_type, queued.attempts, error
        ));

        match queued.attempt_retry(context.max_retries) {
            Some(true) => {
                let retries = queued.retry_count().unwrap_or_default();
                context.logger.warn(&format!(
                    "Retrying task {} ({}/{})",
                    task_id, retries, context.max_retries
                ));
                context.counters.begin_retry();

                match context.queue.requeue(queued).await {
                    Ok(()) => {
                        context.counters.commit_retry();
                        Outcome::Retried
                    }
                    Err(requeue_error) => {
                        context.counters.abort_retry();
                        tracing::warn!(
                            worker_id = self.id,
                            %task_id,
                            error = %requeue_error,
                            "Requeue refused"
                        );
                        context.logger.error(&format!(
                            "Task {} could not be requeued: {}",
                            task_id, requeue_error
                        ));
                        context.counters.record_failure();
                        Outcome::Failed
                    }
                }
            }
            Some(false) => {
                queued.status = TaskStatus::PermanentlyFailed;
                let retries = queued.retry_count().unwrap_or_default();
                context.logger.error(&format!(
                    "Task {} ({}) gave up after {} retries: {}",
                    task_id, task_type, retries, error
                ));
                context.counters.record_failure();
                Outcome::Failed
            }
            None => {
                queued.status = TaskStatus::PermanentlyFailed;
                context.logger.error(&format!(
                    "Task {} ({}) is not retryable: {}",
                    task_id, task_type, error
                ));
                context.counters.record_failure();
                Outcome::Failed
            }
        }
    }
}
