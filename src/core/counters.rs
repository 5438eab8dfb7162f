//! Shared pool counters and the drain signal.
//!
//! Every field is mutated concurrently by the workers, so all of them are
//! atomics. `outstanding` drives the drain: it is raised before a task
//! becomes visible in the queue and lowered only on a terminal outcome.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Notify;

#[cfg(feature = "metrics")]
use crate::metrics::PoolMetrics;

/// Live statistics about the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured number of workers
    pub worker_count: usize,
    /// Tasks submitted but not yet terminally resolved
    pub outstanding: usize,
    /// Tasks inside `process` right now
    pub in_flight: usize,
    /// Tasks accepted through `enqueue_task`
    pub submitted: u64,
    /// Tasks that completed successfully
    pub succeeded: u64,
    /// Tasks that failed permanently
    pub failed: u64,
    /// Tasks that reached a terminal outcome
    pub processed: u64,
    /// Retries scheduled
    pub retried: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    outstanding: AtomicUsize,
    in_flight: AtomicUsize,
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    processed: AtomicU64,
    retried: AtomicU64,
    /// Notified when `outstanding` drops to zero
    drained: Notify,
    #[cfg(feature = "metrics")]
    metrics: Option<PoolMetrics>,
}

impl PoolCounters {
    #[cfg(feature = "metrics")]
    pub fn with_metrics(metrics: Option<PoolMetrics>) -> Self {
        Self {
            metrics,
            ..Default::default()
        }
    }

    #[cfg(feature = "metrics")]
    fn observe(&self, record: impl FnOnce(&PoolMetrics)) {
        if let Some(metrics) = &self.metrics {
            record(metrics);
        }
    }

    /// Account for a task about to enter the queue.
    pub fn admit(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.outstanding.inc());
    }

    /// The queue refused a task that was admitted; undo `admit`.
    pub fn revoke(&self) {
        self.release();
    }

    /// A task accepted by the queue.
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.submitted.inc());
    }

    pub fn begin_execution(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.in_flight.inc());
    }

    pub fn end_execution(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.in_flight.dec());
    }

    /// A failed task is about to go back to the queue. It stays outstanding.
    ///
    /// Must precede the requeue: once visible, the task may settle and the
    /// pool may drain before the requeuing worker resumes.
    pub fn begin_retry(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    /// The requeue announced by `begin_retry` went through.
    pub fn commit_retry(&self) {
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.retried.inc());
    }

    /// The queue refused the requeue announced by `begin_retry`.
    pub fn abort_retry(&self) {
        self.retried.fetch_sub(1, Ordering::SeqCst);
    }

    /// Terminal outcome: success.
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.succeeded.inc());
        self.release();
    }

    /// Terminal outcome: permanent failure.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.failed.inc());
        self.release();
    }

    fn release(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "outstanding counter underflow");
        #[cfg(feature = "metrics")]
        self.observe(|metrics| metrics.outstanding.dec());
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until no task is outstanding.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize) -> PoolStats {
        PoolStats {
            worker_count,
            outstanding: self.outstanding.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_terminal_outcomes_release_outstanding() {
        let counters = PoolCounters::default();
        counters.admit();
        counters.admit();
        counters.admit();
        assert_eq!(counters.outstanding(), 3);

        counters.record_success();
        counters.begin_retry();
        counters.commit_retry();
        counters.begin_retry();
        counters.abort_retry();
        counters.record_failure();
        counters.revoke();

        let stats = counters.snapshot(2);
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.worker_count, 2);
    }

    #[tokio::test]
    async fn test_wait_drained_returns_immediately_when_idle() {
        let counters = PoolCounters::default();
        tokio::time::timeout(Duration::from_millis(100), counters.wait_drained())
            .await
            .expect("idle counters should be drained");
    }

    #[tokio::test]
    async fn test_wait_drained_wakes_on_last_release() {
        let counters = Arc::new(PoolCounters::default());
        counters.admit();
        counters.admit();

        let waiter = {
            let counters = Arc::clone(&counters);
            tokio::spawn(async move { counters.wait_drained().await })
        };

        counters.record_success();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        counters.record_failure();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("drain should complete")
            .unwrap();
    }
}
