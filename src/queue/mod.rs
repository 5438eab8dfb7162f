//! Queue backends for tqwp task processing.
//!
//! The pool talks to its queue through [`QueueBackend`]. The crate ships one
//! backend, [`BoundedQueue`]: an in-memory FIFO with a fixed capacity that
//! provides backpressure to producers.
//!
//! # Examples
//!
//! ```rust
//! use tqwp::config::QueueConfig;
//! use tqwp::queue::{BoundedQueue, QueueBackend};
//!
//! # async fn example() {
//! let queue = BoundedQueue::with_config(QueueConfig::with_capacity(8));
//! assert_eq!(queue.capacity(), 8);
//! assert_eq!(queue.len().await, 0);
//! # }
//! ```

use crate::error::PoolResult;
use crate::task::QueuedTask;
use async_trait::async_trait;
use serde::Serialize;

pub mod memory;
pub use memory::BoundedQueue;

/// Statistics about the queue state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Number of tasks currently buffered
    pub depth: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Total tasks accepted through `enqueue`
    pub enqueued: u64,
    /// Total tasks resubmitted through `requeue`
    pub requeued: u64,
    /// Total tasks handed out by `dequeue`
    pub dequeued: u64,
    /// Requeued tasks admitted while the queue was already full
    pub overflowed: u64,
    /// Whether the queue has been closed
    pub closed: bool,
}

/// Trait that all queue backends must implement
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Append a new task to the tail.
    ///
    /// Waits for a free slot or fails with `QueueFull`, depending on the
    /// configured overflow policy. Fails with `QueueClosed` once the queue has
    /// been closed, including for producers that were waiting for a slot.
    async fn enqueue(&self, task: QueuedTask) -> PoolResult<()>;

    /// Resubmit a task for another attempt.
    ///
    /// Never waits: a retry takes a free slot when there is one and is
    /// admitted past capacity otherwise, so that workers cannot deadlock on
    /// their own resubmissions.
    async fn requeue(&self, task: QueuedTask) -> PoolResult<()>;

    /// Remove the task at the head, waiting while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and every buffered task has
    /// been handed out.
    async fn dequeue(&self) -> Option<QueuedTask>;

    /// Forbid further submissions. Buffered tasks are kept. Idempotent.
    async fn close(&self);

    /// Whether `close` has been called
    fn is_closed(&self) -> bool;

    /// Number of tasks currently buffered
    async fn len(&self) -> usize;

    /// Whether no task is buffered
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Maximum number of buffered tasks accepted through `enqueue`
    fn capacity(&self) -> usize;

    /// Get queue statistics
    async fn stats(&self) -> QueueStats;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::task::{Task, TaskResult};
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl Task for Noop {
        async fn process(&mut self) -> TaskResult {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_backend_through_trait_object() {
        let queue: Arc<dyn QueueBackend> =
            Arc::new(BoundedQueue::with_config(QueueConfig::with_capacity(4)));

        assert!(queue.is_empty().await);
        queue.enqueue(QueuedTask::new(Box::new(Noop))).await.unwrap();
        assert!(!queue.is_empty().await);

        let task = queue.dequeue().await;
        assert!(task.is_some());

        queue.close().await;
        assert!(queue.is_closed());
        assert!(queue.dequeue().await.is_none());

        let stats = queue.stats().await;
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.dequeued, 1);
        assert!(stats.closed);
    }
}
