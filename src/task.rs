//! Task definition and retry capability.

use crate::error::TaskError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Outcome of a single task execution.
pub type TaskResult = Result<(), TaskError>;

/// Unique identifier assigned to a task when it is enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Status of a task in the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is waiting in the queue for its first execution
    Pending,
    /// Task is currently being processed by a worker
    Executing,
    /// Task failed and is waiting in the queue for another attempt
    RetryPending,
    /// Task completed successfully
    Succeeded,
    /// Task failed and will not be retried
    PermanentlyFailed,
}

impl TaskStatus {
    /// Whether no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::PermanentlyFailed)
    }
}

/// Trait that all tasks must implement to be processed by the pool.
///
/// `process` may be called several times on the same instance when the task
/// is retryable. Re-running it after a partial failure must be an acceptable
/// recovery action for the task.
#[async_trait]
pub trait Task: Send + 'static {
    /// Execute the unit of work
    async fn process(&mut self) -> TaskResult;

    /// Get the task type identifier
    ///
    /// By default, this returns the type name, but can be overridden
    /// for custom task type identifiers.
    fn task_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Access the retry capability of this task.
    ///
    /// Tasks returning `None` (the default) fail fast: their first failure is
    /// terminal.
    fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
        None
    }
}

/// Optional retry capability of a task.
pub trait Retryable: Send {
    /// Consume one retry unit.
    ///
    /// Returns `true` and increments the counter iff the counter was below
    /// `max_retries`.
    fn attempt_retry(&mut self, max_retries: u32) -> bool;

    /// Number of retries granted so far
    fn retry_count(&self) -> u32;
}

/// Ready-made retry counter that tasks embed to become retryable.
///
/// ```rust
/// use tqwp::prelude::*;
///
/// struct Flaky {
///     retry: RetryState,
/// }
///
/// #[async_trait]
/// impl Task for Flaky {
///     async fn process(&mut self) -> TaskResult {
///         Err(TaskError::new("upstream unavailable"))
///     }
///
///     fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
///         Some(&mut self.retry)
///     }
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    retries: u32,
}

impl RetryState {
    /// Create a counter that has not granted any retry
    pub fn new() -> Self {
        Self::default()
    }
}

impl Retryable for RetryState {
    fn attempt_retry(&mut self, max_retries: u32) -> bool {
        if self.retries < max_retries {
            self.retries += 1;
            true
        } else {
            false
        }
    }

    fn retry_count(&self) -> u32 {
        self.retries
    }
}

/// Internal representation of a task in the queue
pub struct QueuedTask {
    /// Unique task identifier
    pub id: TaskId,
    /// Current status
    pub status: TaskStatus,
    /// Number of executions so far
    pub attempts: u32,
    /// When the task was first enqueued
    pub enqueued_at: SystemTime,
    task: Box<dyn Task>,
}

impl QueuedTask {
    /// Wrap a task for submission
    pub fn new(task: Box<dyn Task>) -> Self {
        Self {
            id: TaskId::new(),
            status: TaskStatus::Pending,
            attempts: 0,
            enqueued_at: SystemTime::now(),
            task,
        }
    }

    /// Type identifier of the wrapped task
    pub fn task_type(&self) -> &'static str {
        self.task.task_type()
    }

    /// Retry count reported by the wrapped task, if it is retryable
    pub fn retry_count(&mut self) -> Option<u32> {
        self.task.retry_state().map(|retry| retry.retry_count())
    }

    /// Hand the retry decision to the wrapped task.
    ///
    /// `None` when the task has no retry capability.
    pub(crate) fn attempt_retry(&mut self, max_retries: u32) -> Option<bool> {
        self.task
            .retry_state()
            .map(|retry| retry.attempt_retry(max_retries))
    }

    /// Run one attempt of the wrapped task.
    pub(crate) async fn execute(&mut self) -> TaskResult {
        self.status = TaskStatus::Executing;
        self.attempts += 1;
        self.task.process().await
    }
}

impl fmt::Debug for QueuedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedTask")
            .field("id", &self.id)
            .field("task_type", &self.task_type())
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Task for Noop {
        async fn process(&mut self) -> TaskResult {
            Ok(())
        }
    }

    struct WithRetry {
        retry: RetryState,
    }

    #[async_trait]
    impl Task for WithRetry {
        async fn process(&mut self) -> TaskResult {
            Err(TaskError::new("always"))
        }

        fn task_type(&self) -> &'static str {
            "with_retry"
        }

        fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
            Some(&mut self.retry)
        }
    }

    #[test]
    fn test_retry_state_budget() {
        let mut retry = RetryState::new();
        assert!(retry.attempt_retry(2));
        assert!(retry.attempt_retry(2));
        assert!(!retry.attempt_retry(2));
        assert!(!retry.attempt_retry(2));
        assert_eq!(retry.retry_count(), 2);
    }

    #[test]
    fn test_zero_budget_never_retries() {
        let mut retry = RetryState::new();
        assert!(!retry.attempt_retry(0));
        assert_eq!(retry.retry_count(), 0);
    }

    #[test]
    fn test_status_terminality() {
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::PermanentlyFailed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::RetryPending.is_terminal());
        assert!(!TaskStatus::Executing.is_terminal());
    }

    #[test]
    fn test_queued_task_capability() {
        let mut plain = QueuedTask::new(Box::new(Noop));
        assert_eq!(plain.status, TaskStatus::Pending);
        assert_eq!(plain.attempts, 0);
        assert!(plain.retry_count().is_none());
        assert!(plain.task_type().ends_with("Noop"));

        let mut retryable = QueuedTask::new(Box::new(WithRetry {
            retry: RetryState::new(),
        }));
        assert_eq!(retryable.retry_count(), Some(0));
        assert_eq!(retryable.task_type(), "with_retry");
        assert_ne!(plain.id, retryable.id);
    }

    #[tokio::test]
    async fn test_execute_tracks_attempts() {
        let mut queued = QueuedTask::new(Box::new(WithRetry {
            retry: RetryState::new(),
        }));

        assert!(queued.execute().await.is_err());
        assert_eq!(queued.status, TaskStatus::Executing);
        assert_eq!(queued.attempts, 1);

        assert_eq!(queued.attempt_retry(1), Some(true));
        assert_eq!(queued.attempt_retry(1), Some(false));
        assert_eq!(queued.retry_count(), Some(1));

        let mut plain = QueuedTask::new(Box::new(Noop));
        assert!(plain.execute().await.is_ok());
        assert_eq!(plain.attempt_retry(3), None);
    }
}
