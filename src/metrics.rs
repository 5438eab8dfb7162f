//! Prometheus metrics for a worker pool.
//!
//! ```rust,no_run
//! use tqwp::prelude::*;
//!
//! # async fn example() -> PoolResult<()> {
//! let metrics = PoolMetrics::new("tqwp")?;
//! let pool = WorkerPool::builder(PoolConfig::default())
//!     .metrics(metrics.clone())
//!     .build()?;
//! pool.start().await?;
//! pool.stop().await?;
//! println!("{}", metrics.gather_text()?);
//! # Ok(())
//! # }
//! ```

use prometheus::{IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::error::PoolResult;

/// Counters and gauges updated by the pool as tasks move through it.
#[derive(Clone)]
pub struct PoolMetrics {
    registry: Registry,
    pub(crate) submitted: IntCounter,
    pub(crate) succeeded: IntCounter,
    pub(crate) failed: IntCounter,
    pub(crate) retried: IntCounter,
    pub(crate) in_flight: IntGauge,
    pub(crate) outstanding: IntGauge,
}

impl PoolMetrics {
    /// Create the metrics in a fresh registry, prefixed with `namespace`.
    pub fn new(namespace: &str) -> PoolResult<Self> {
        Self::with_registry(namespace, Registry::new())
    }

    /// Create the metrics and register them in an existing registry.
    pub fn with_registry(namespace: &str, registry: Registry) -> PoolResult<Self> {
        let counter = |name: &str, help: &str| -> PoolResult<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help).namespace(namespace))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };
        let gauge = |name: &str, help: &str| -> PoolResult<IntGauge> {
            let gauge = IntGauge::with_opts(Opts::new(name, help).namespace(namespace))?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        Ok(Self {
            submitted: counter("tasks_submitted_total", "Tasks accepted by the queue")?,
            succeeded: counter("tasks_succeeded_total", "Tasks that completed successfully")?,
            failed: counter("tasks_failed_total", "Tasks that failed permanently")?,
            retried: counter("tasks_retried_total", "Retries scheduled")?,
            in_flight: gauge("tasks_in_flight", "Tasks currently executing")?,
            outstanding: gauge("tasks_outstanding", "Tasks not yet terminally resolved")?,
            registry,
        })
    }

    /// The registry holding the pool metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn gather_text(&self) -> PoolResult<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}

impl std::fmt::Debug for PoolMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolMetrics")
            .field("submitted", &self.submitted.get())
            .field("succeeded", &self.succeeded.get())
            .field("failed", &self.failed.get())
            .field("retried", &self.retried.get())
            .field("in_flight", &self.in_flight.get())
            .field("outstanding", &self.outstanding.get())
            .finish()
    }
}
