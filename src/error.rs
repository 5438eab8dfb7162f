//! Error types for tqwp operations.

use thiserror::Error;

/// Result type used throughout tqwp.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors surfaced to callers of the pool and queue.
///
/// Task failures never show up here: they are absorbed into the pool counters
/// and reported through the logger. Only lifecycle misuse reaches the caller.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The queue has been closed and accepts no further tasks
    #[error("Queue is closed; no further tasks are accepted")]
    QueueClosed,

    /// The queue is at capacity and the overflow policy rejects new tasks
    #[error("Queue is full (capacity: {capacity})")]
    QueueFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// The pool is already running
    #[error("Worker pool is already running")]
    AlreadyRunning,

    /// The pool was never started
    #[error("Worker pool is not running")]
    NotRunning,

    /// The pool has been stopped and cannot be restarted
    #[error("Worker pool has been stopped")]
    Stopped,

    /// The run summary was requested before the pool drained
    #[error("Run summary is unavailable until the pool has drained")]
    NotDrained,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Metrics registry error
    #[cfg(feature = "metrics")]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl PoolError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

/// Failure signal returned by [`Task::process`](crate::task::Task::process).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TaskError {
    /// What went wrong
    pub message: String,
    /// Optional underlying error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TaskError {
    /// Create a task error from a message alone
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a task error wrapping an underlying cause
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(format!("I/O error: {err}"), err)
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(format!("JSON error: {err}"), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(
            PoolError::QueueFull { capacity: 2 }.to_string(),
            "Queue is full (capacity: 2)"
        );
        assert_eq!(
            PoolError::config("workers must be positive").to_string(),
            "Configuration error: workers must be positive"
        );
    }

    #[test]
    fn test_task_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err = TaskError::from(io);

        assert!(err.message.contains("missing.json"));
        assert!(err.source().is_some());
        assert!(TaskError::new("boom").source().is_none());
    }
}
