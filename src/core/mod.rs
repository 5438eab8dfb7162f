//! The worker pool and its lifecycle.
//!
//! [`WorkerPool`] is the heart of tqwp: it owns the queue, the counters and
//! the workers, and walks through `Idle → Running → Draining → Stopped`.

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::logging::{PoolLogger, TracingLogger};
use crate::queue::{BoundedQueue, QueueBackend, QueueStats};
use crate::task::{QueuedTask, Task, TaskId};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[cfg(feature = "metrics")]
use crate::metrics::PoolMetrics;

pub(crate) mod counters;
pub(crate) mod engine;
pub mod summary;
pub(crate) mod worker;

pub use counters::PoolStats;
pub use summary::RunSummary;

use counters::PoolCounters;
use engine::PoolEngine;
use worker::WorkerContext;

/// Lifecycle state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum PoolState {
    /// Constructed, workers not spawned yet. Tasks may already be enqueued.
    Idle = 0,
    /// Workers are processing tasks
    Running = 1,
    /// `stop` is waiting for outstanding tasks to settle
    Draining = 2,
    /// Workers have exited and the summary is available
    Stopped = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Idle,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            _ => PoolState::Stopped,
        }
    }
}

/// Mutable lifecycle data, serialized by the pool's lifecycle mutex
#[derive(Default)]
struct Lifecycle {
    engine: Option<PoolEngine>,
    started_at: Option<Instant>,
}

/// A fixed-size pool of workers draining a bounded queue.
///
/// # Examples
///
/// ```rust
/// use tqwp::prelude::*;
///
/// struct Hello;
///
/// #[async_trait]
/// impl Task for Hello {
///     async fn process(&mut self) -> TaskResult {
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> PoolResult<()> {
///     let pool = WorkerPool::new(PoolConfig::default().with_workers(3))?;
///     pool.start().await?;
///     for _ in 0..10 {
///         pool.enqueue_task(Hello).await?;
///     }
///     pool.stop().await?;
///
///     let summary = pool.summary()?;
///     assert_eq!(summary.succeeded, 10);
///     Ok(())
/// }
/// ```
pub struct WorkerPool {
    config: PoolConfig,
    queue: Arc<dyn QueueBackend>,
    counters: Arc<PoolCounters>,
    logger: Arc<dyn PoolLogger>,
    /// Cleared as soon as `stop` begins
    accepting: AtomicBool,
    state: AtomicU8,
    lifecycle: Mutex<Lifecycle>,
    summary: OnceLock<RunSummary>,
}

impl WorkerPool {
    /// Create a pool with the default in-memory queue and the tracing logger.
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        Self::builder(config).build()
    }

    /// Start building a pool with custom collaborators
    pub fn builder(config: PoolConfig) -> PoolBuilder {
        PoolBuilder::new(config)
    }

    /// Spawn the workers.
    ///
    /// Tasks enqueued before `start` are processed in order once the workers
    /// are up.
    pub async fn start(&self) -> PoolResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match self.state() {
            PoolState::Idle => {}
            PoolState::Running | PoolState::Draining => return Err(PoolError::AlreadyRunning),
            PoolState::Stopped => return Err(PoolError::Stopped),
        }

        let context = Arc::new(WorkerContext {
            queue: Arc::clone(&self.queue),
            counters: Arc::clone(&self.counters),
            logger: Arc::clone(&self.logger),
            max_retries: self.config.retry.max_retries,
        });

        lifecycle.engine = Some(PoolEngine::start(self.config.workers.num_workers, context));
        lifecycle.started_at = Some(Instant::now());
        self.set_state(PoolState::Running);

        tracing::info!(
            num_workers = self.config.workers.num_workers,
            max_retries = self.config.retry.max_retries,
            capacity = self.queue.capacity(),
            "Worker pool started"
        );
        self.logger.info(&format!(
            "Worker pool started with {} worker(s)",
            self.config.workers.num_workers
        ));
        Ok(())
    }

    /// Submit a task for processing.
    ///
    /// May wait for a free queue slot, depending on the overflow policy. Fails
    /// with [`PoolError::QueueClosed`] once `stop` has begun. A failed
    /// submission leaves the pool counters untouched.
    pub async fn enqueue_task<T: Task>(&self, task: T) -> PoolResult<TaskId> {
        self.enqueue_boxed(Box::new(task)).await
    }

    /// Submit an already boxed task
    pub async fn enqueue_boxed(&self, task: Box<dyn Task>) -> PoolResult<TaskId> {
        // Admit before checking the flag: `stop` clears the flag before it
        // reads `outstanding`, so one of the two always sees the other.
        self.counters.admit();
        if !self.accepting.load(Ordering::SeqCst) {
            self.counters.revoke();
            return Err(PoolError::QueueClosed);
        }

        let queued = QueuedTask::new(task);
        let task_id = queued.id;
        let task_type = queued.task_type();

        match self.queue.enqueue(queued).await {
            Ok(()) => {
                self.counters.record_submitted();
                tracing::debug!(%task_id, task_type, "Task enqueued");
                Ok(task_id)
            }
            Err(error) => {
                self.counters.revoke();
                tracing::debug!(%task_id, task_type, %error, "Task refused");
                Err(error)
            }
        }
    }

    /// Wait for every outstanding task to settle, then shut the workers down.
    ///
    /// There is no forced interruption: a task stuck in `process` keeps `stop`
    /// waiting. Stopping an idle pool succeeds only when nothing was
    /// enqueued, since no worker would ever drain the queue. A second call is
    /// a no-op.
    pub async fn stop(&self) -> PoolResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match self.state() {
            PoolState::Stopped => return Ok(()),
            PoolState::Idle => return self.stop_idle().await,
            PoolState::Running | PoolState::Draining => {}
        }

        self.accepting.store(false, Ordering::SeqCst);
        self.set_state(PoolState::Draining);
        tracing::info!(
            outstanding = self.counters.outstanding(),
            "Draining worker pool"
        );

        self.counters.wait_drained().await;
        let elapsed = lifecycle
            .started_at
            .map(|started_at| started_at.elapsed())
            .unwrap_or_default();

        self.queue.close().await;
        let mut attempts = 0;
        if let Some(engine) = lifecycle.engine.take() {
            tracing::debug!(workers = engine.worker_count(), "Joining workers");
            attempts = engine.join().await;
        }

        self.finish(elapsed, attempts);
        Ok(())
    }

    async fn stop_idle(&self) -> PoolResult<()> {
        self.accepting.store(false, Ordering::SeqCst);
        if self.counters.outstanding() > 0 {
            self.accepting.store(true, Ordering::SeqCst);
            return Err(PoolError::NotRunning);
        }

        self.queue.close().await;
        self.finish(Duration::ZERO, 0);
        Ok(())
    }

    fn finish(&self, elapsed: Duration, attempts: u64) {
        let stats = self.stats();
        let summary = RunSummary {
            processed: stats.processed,
            succeeded: stats.succeeded,
            failed: stats.failed,
            retried: stats.retried,
            attempts,
            worker_count: stats.worker_count,
            elapsed,
        };

        tracing::info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            attempts = summary.attempts,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Worker pool stopped"
        );
        summary.emit(self.logger.as_ref());

        // Only the lifecycle holder gets here, and only once.
        let _ = self.summary.set(summary);
        self.set_state(PoolState::Stopped);
    }

    /// Summary of the run, available once `stop` has returned
    pub fn summary(&self) -> PoolResult<RunSummary> {
        self.summary.get().cloned().ok_or(PoolError::NotDrained)
    }

    /// Live counters
    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot(self.config.workers.num_workers)
    }

    /// Current statistics of the queue
    pub async fn queue_stats(&self) -> QueueStats {
        self.queue.stats().await
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Configuration the pool was built with
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Builder for [`WorkerPool`] with custom collaborators.
pub struct PoolBuilder {
    config: PoolConfig,
    logger: Option<Arc<dyn PoolLogger>>,
    queue: Option<Arc<dyn QueueBackend>>,
    #[cfg(feature = "metrics")]
    metrics: Option<PoolMetrics>,
}

impl PoolBuilder {
    fn new(config: PoolConfig) -> Self {
        Self {
            config,
            logger: None,
            queue: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Report task outcomes to `logger` instead of `tracing`
    pub fn logger<L: PoolLogger + 'static>(self, logger: L) -> Self {
        self.shared_logger(Arc::new(logger))
    }

    /// Report task outcomes to a logger the caller keeps a handle on
    pub fn shared_logger(mut self, logger: Arc<dyn PoolLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Use a custom queue backend instead of the in-memory one.
    ///
    /// The queue settings of the configuration are ignored in that case.
    pub fn queue<Q: QueueBackend + 'static>(mut self, queue: Q) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    /// Export pool activity through prometheus
    #[cfg(feature = "metrics")]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    pub fn metrics(mut self, metrics: PoolMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validate the configuration and assemble the pool
    pub fn build(self) -> PoolResult<WorkerPool> {
        self.config
            .validate()
            .map_err(|errors| PoolError::config(errors.join("; ")))?;

        let queue = self
            .queue
            .unwrap_or_else(|| Arc::new(BoundedQueue::with_config(self.config.queue.clone())));
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));

        #[cfg(feature = "metrics")]
        let counters = PoolCounters::with_metrics(self.metrics);
        #[cfg(not(feature = "metrics"))]
        let counters = PoolCounters::default();

        Ok(WorkerPool {
            config: self.config,
            queue,
            counters: Arc::new(counters),
            logger,
            accepting: AtomicBool::new(true),
            state: AtomicU8::new(PoolState::Idle as u8),
            lifecycle: Mutex::new(Lifecycle::default()),
            summary: OnceLock::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoopLogger;
    use crate::task::TaskResult;
    use async_trait::async_trait;

    struct Quick;

    #[async_trait]
    impl Task for Quick {
        async fn process(&mut self) -> TaskResult {
            Ok(())
        }
    }

    fn pool(config: PoolConfig) -> WorkerPool {
        WorkerPool::builder(config).logger(NoopLogger).build().unwrap()
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = WorkerPool::new(PoolConfig::default().with_workers(0));
        assert!(matches!(result, Err(PoolError::ConfigError { .. })));
    }

    #[tokio::test]
    async fn test_lifecycle_states() {
        let pool = pool(PoolConfig::testing());
        assert_eq!(pool.state(), PoolState::Idle);

        pool.start().await.unwrap();
        assert_eq!(pool.state(), PoolState::Running);
        assert!(matches!(pool.start().await, Err(PoolError::AlreadyRunning)));

        pool.enqueue_task(Quick).await.unwrap();
        pool.stop().await.unwrap();
        assert_eq!(pool.state(), PoolState::Stopped);
        assert!(matches!(pool.start().await, Err(PoolError::Stopped)));
    }

    #[tokio::test]
    async fn test_stop_idle_pool_without_tasks() {
        let pool = pool(PoolConfig::testing());
        pool.stop().await.unwrap();

        let summary = pool.summary().unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.elapsed, Duration::ZERO);
        assert!(pool.queue_stats().await.closed);
    }

    #[tokio::test]
    async fn test_stop_idle_pool_with_tasks_is_refused() {
        let pool = pool(PoolConfig::testing());
        pool.enqueue_task(Quick).await.unwrap();

        assert!(matches!(pool.stop().await, Err(PoolError::NotRunning)));
        assert_eq!(pool.state(), PoolState::Idle);

        // Still usable afterwards
        pool.enqueue_task(Quick).await.unwrap();
        pool.start().await.unwrap();
        pool.stop().await.unwrap();
        assert_eq!(pool.summary().unwrap().succeeded, 2);
    }

    #[tokio::test]
    async fn test_summary_unavailable_before_stop() {
        let pool = pool(PoolConfig::testing());
        pool.start().await.unwrap();
        assert!(matches!(pool.summary(), Err(PoolError::NotDrained)));
        pool.stop().await.unwrap();
        assert!(pool.summary().is_ok());
    }

    #[tokio::test]
    async fn test_custom_queue_backend() {
        let queue = BoundedQueue::with_config(crate::config::QueueConfig::with_capacity(3));
        let pool = WorkerPool::builder(PoolConfig::testing())
            .queue(queue)
            .logger(NoopLogger)
            .build()
            .unwrap();

        assert_eq!(pool.queue_stats().await.capacity, 3);
    }
}
