//! # tqwp
//!
//! A bounded async task queue drained by a fixed-size worker pool.
//!
//! ## Features
//!
//! - **Bounded concurrency**: at most `num_workers` tasks execute at once
//! - **Backpressure**: producers wait (or are rejected) when the queue is full
//! - **Retries**: failed tasks that opt in are requeued to the tail of the queue
//! - **Graceful drain**: `stop` waits until every task has settled
//! - **Observability**: `tracing` diagnostics, a pluggable outcome logger and
//!   optional prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use tqwp::prelude::*;
//!
//! struct SendEmail {
//!     to: String,
//!     retry: RetryState,
//! }
//!
//! #[async_trait]
//! impl Task for SendEmail {
//!     async fn process(&mut self) -> TaskResult {
//!         if self.to.is_empty() {
//!             return Err(TaskError::new("missing recipient"));
//!         }
//!         Ok(())
//!     }
//!
//!     fn retry_state(&mut self) -> Option<&mut dyn Retryable> {
//!         Some(&mut self.retry)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> PoolResult<()> {
//!     let config = PoolConfig::default().with_workers(4).with_max_retries(2);
//!     let pool = WorkerPool::builder(config).logger(NoopLogger).build()?;
//!
//!     pool.start().await?;
//!     for to in ["ada@example.com", ""] {
//!         pool.enqueue_task(SendEmail {
//!             to: to.to_string(),
//!             retry: RetryState::new(),
//!         })
//!         .await?;
//!     }
//!     pool.stop().await?;
//!
//!     let summary = pool.summary()?;
//!     assert_eq!(summary.succeeded, 1);
//!     assert_eq!(summary.failed, 1);
//!     assert_eq!(summary.retried, 2);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod queue;
pub mod task;

#[cfg(feature = "metrics")]
#[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
pub mod metrics;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::core::{PoolBuilder, PoolState, PoolStats, RunSummary, WorkerPool};
    pub use crate::error::{PoolError, PoolResult, TaskError};
    pub use crate::logging::{ConsoleLogger, NoopLogger, PoolLogger, TracingLogger, init_tracing};
    pub use crate::queue::{BoundedQueue, QueueBackend, QueueStats};
    pub use crate::task::{
        QueuedTask, RetryState, Retryable, Task, TaskId, TaskResult, TaskStatus,
    };
    pub use async_trait::async_trait;

    #[cfg(feature = "metrics")]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    pub use crate::metrics::PoolMetrics;
}

pub use crate::config::PoolConfig;
pub use crate::core::{PoolBuilder, PoolState, PoolStats, RunSummary, WorkerPool};
pub use crate::error::{PoolError, PoolResult, TaskError};
pub use crate::task::{RetryState, Retryable, Task, TaskId, TaskResult};
pub use async_trait::async_trait;
