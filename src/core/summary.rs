//! Run summary produced once a pool has drained.

use crate::logging::PoolLogger;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Snapshot of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Tasks that reached a terminal outcome
    pub processed: u64,
    /// Tasks that completed successfully
    pub succeeded: u64,
    /// Tasks that failed permanently
    pub failed: u64,
    /// Retries scheduled during the run
    pub retried: u64,
    /// Executions of `process` across all workers, retries included
    pub attempts: u64,
    /// Configured number of workers
    pub worker_count: usize,
    /// Wall-clock time from `start` until the drain completed
    pub elapsed: Duration,
}

impl RunSummary {
    /// Fraction of processed tasks that succeeded, `None` when nothing ran.
    pub fn success_rate(&self) -> Option<f64> {
        (self.processed > 0).then(|| self.succeeded as f64 / self.processed as f64)
    }

    /// Report the summary through `logger`.
    pub fn emit(&self, logger: &dyn PoolLogger) {
        logger.tagged("[SUMMARY]", &self.to_string());
        if self.failed > 0 {
            logger.warn(&format!("{} task(s) failed permanently", self.failed));
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {} task(s) with {} worker(s) in {:?}: {} succeeded, {} failed, {} retries",
            self.processed,
            self.worker_count,
            self.elapsed,
            self.succeeded,
            self.failed,
            self.retried
        )
    }
}
