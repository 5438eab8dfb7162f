//! In-memory bounded queue implementation for tqwp.
//!
//! Tasks are buffered in a FIFO guarded by an async mutex. Capacity is
//! enforced with a semaphore holding one permit per free slot: a buffered
//! task owns its permit and releases it the moment a worker dequeues it,
//! which is what unblocks a waiting producer.
//!
//! # Features
//!
//! - **Backpressure**: `enqueue` waits for a slot, or rejects, per [`OverflowPolicy`]
//! - **Close-then-drain**: closing keeps buffered tasks available to consumers
//! - **Retry-safe**: `requeue` never blocks a worker

use super::{QueueBackend, QueueStats};
use crate::config::{OverflowPolicy, QueueConfig};
use crate::error::{PoolError, PoolResult};
use crate::task::{QueuedTask, TaskStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// A buffered task and the capacity slot it occupies.
///
/// Requeued tasks admitted past capacity carry no permit.
#[derive(Debug)]
struct Slot {
    task: QueuedTask,
    _permit: Option<OwnedSemaphorePermit>,
}

#[derive(Debug, Default)]
struct State {
    buffer: VecDeque<Slot>,
    closed: bool,
    enqueued: u64,
    requeued: u64,
    dequeued: u64,
    overflowed: u64,
}

/// In-memory bounded FIFO queue
#[derive(Debug)]
pub struct BoundedQueue {
    /// Buffered tasks and counters
    state: Mutex<State>,
    /// One permit per free slot
    slots: Arc<Semaphore>,
    /// Signalled on every push and on close
    not_empty: Notify,
    /// Mirror of `State::closed` for lock-free reads
    closed: AtomicBool,
    /// Queue configuration
    config: QueueConfig,
}

impl BoundedQueue {
    /// Create a new queue with default configuration
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create a new queue with custom configuration.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn with_config(mut config: QueueConfig) -> Self {
        config.capacity = config.capacity.clamp(1, Semaphore::MAX_PERMITS);

        Self {
            state: Mutex::new(State::default()),
            slots: Arc::new(Semaphore::new(config.capacity)),
            not_empty: Notify::new(),
            closed: AtomicBool::new(false),
            config,
        }
    }

    async fn push(
        &self,
        task: QueuedTask,
        permit: Option<OwnedSemaphorePermit>,
        is_retry: bool,
    ) -> PoolResult<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PoolError::QueueClosed);
        }

        if is_retry {
            state.requeued += 1;
            if permit.is_none() {
                state.overflowed += 1;
            }
        } else {
            state.enqueued += 1;
        }

        let task_id = task.id;
        state.buffer.push_back(Slot {
            task,
            _permit: permit,
        });
        let depth = state.buffer.len();
        drop(state);

        self.not_empty.notify_one();
        tracing::trace!(%task_id, depth, is_retry, "Task buffered");
        Ok(())
    }
}

impl Default for BoundedQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueBackend for BoundedQueue {
    async fn enqueue(&self, mut task: QueuedTask) -> PoolResult<()> {
        let permit = match self.config.overflow {
            OverflowPolicy::Block => Arc::clone(&self.slots)
                .acquire_owned()
                .await
                .map_err(|_| PoolError::QueueClosed)?,
            OverflowPolicy::Reject => {
                Arc::clone(&self.slots)
                    .try_acquire_owned()
                    .map_err(|err| match err {
                        TryAcquireError::Closed => PoolError::QueueClosed,
                        TryAcquireError::NoPermits => PoolError::QueueFull {
                            capacity: self.config.capacity,
                        },
                    })?
            }
        };

        task.status = TaskStatus::Pending;
        self.push(task, Some(permit), false).await
    }

    async fn requeue(&self, mut task: QueuedTask) -> PoolResult<()> {
        let permit = match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(TryAcquireError::NoPermits) => None,
            Err(TryAcquireError::Closed) => return Err(PoolError::QueueClosed),
        };

        task.status = TaskStatus::RetryPending;
        self.push(task, permit, true).await
    }

    async fn dequeue(&self) -> Option<QueuedTask> {
        loop {
            // Registered before inspecting the buffer so a push or close
            // racing with the check still wakes us.
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(slot) = state.buffer.pop_front() {
                    state.dequeued += 1;
                    let more = !state.buffer.is_empty();
                    drop(state);

                    if more {
                        self.not_empty.notify_one();
                    }
                    return Some(slot.task);
                }

                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        self.closed.store(true, Ordering::Release);
        let remaining = state.buffer.len();
        drop(state);

        self.slots.close();
        self.not_empty.notify_waiters();
        tracing::debug!(remaining, "Queue closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn len(&self) -> usize {
        self.state.lock().await.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.config.capacity
    }

    async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        QueueStats {
            depth: state.buffer.len(),
            capacity: self.config.capacity,
            enqueued: state.enqueued,
            requeued: state.requeued,
            dequeued: state.dequeued,
            overflowed: state.overflowed,
            closed: state.closed,
        }
    }
}
