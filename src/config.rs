//! Configuration types for tqwp.
//!
//! This module contains the configuration structures used to build a
//! [`WorkerPool`](crate::core::WorkerPool): worker settings, queue bounds,
//! the retry budget, and logging.

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Main configuration for a worker pool.
///
/// # Examples
///
/// ```rust
/// use tqwp::config::{PoolConfig, QueueConfig, WorkerConfig};
///
/// // Use default configuration
/// let config = PoolConfig::default();
///
/// // Custom configuration
/// let config = PoolConfig {
///     workers: WorkerConfig::with_workers(4),
///     queue: QueueConfig::with_capacity(500),
///     ..Default::default()
/// }
/// .with_max_retries(5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker-related configuration
    pub workers: WorkerConfig,

    /// Queue configuration
    pub queue: QueueConfig,

    /// Retry budget applied to retryable tasks
    pub retry: RetryPolicy,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of workers, which is also the ceiling on concurrently executing tasks
    pub num_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { num_workers: 10 }
    }
}

impl WorkerConfig {
    /// Create a new worker configuration with a specific number of workers.
    pub fn with_workers(num_workers: usize) -> Self {
        Self { num_workers }
    }
}

/// What `enqueue` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until a worker frees a slot
    Block,
    /// Fail immediately with [`PoolError::QueueFull`]
    Reject,
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of buffered tasks (must be > 0)
    pub capacity: usize,

    /// Behaviour of `enqueue` on a full queue
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            overflow: OverflowPolicy::Block,
        }
    }
}

impl QueueConfig {
    /// Create a queue configuration with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }
}

/// Retry policy configuration.
///
/// The first execution of a task is free; every failed execution consumes one
/// unit of budget, so a task runs at most `max_retries + 1` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    /// Create a retry policy with the given budget.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Disable retries completely.
    pub fn none() -> Self {
        Self { max_retries: 0 }
    }

    /// Total executions a retryable task may receive under this policy.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: LogLevel,

    /// Enable colored output
    pub colored: bool,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include target module in logs
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            colored: true,
            include_timestamps: true,
            include_targets: false,
        }
    }
}

/// Log level enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl PoolConfig {
    /// Set the number of workers.
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.workers.num_workers = num_workers;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Set the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue.capacity = capacity;
        self
    }

    /// Set the queue overflow policy.
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.queue.overflow = overflow;
        self
    }

    /// Create a new configuration optimized for development.
    pub fn development() -> Self {
        Self {
            workers: WorkerConfig { num_workers: 2 },
            queue: QueueConfig::with_capacity(50),
            retry: RetryPolicy::with_max_retries(3),
            logging: LoggingConfig {
                level: LogLevel::Debug,
                include_targets: true,
                ..Default::default()
            },
        }
    }

    /// Create a new configuration optimized for production.
    pub fn production() -> Self {
        Self {
            workers: WorkerConfig {
                num_workers: num_cpus::get().max(1) * 2,
            },
            queue: QueueConfig::with_capacity(10_000),
            retry: RetryPolicy::with_max_retries(5),
            logging: LoggingConfig {
                level: LogLevel::Info,
                colored: false,
                ..Default::default()
            },
        }
    }

    /// Create a configuration for testing.
    pub fn testing() -> Self {
        Self {
            workers: WorkerConfig { num_workers: 1 },
            queue: QueueConfig::with_capacity(16),
            retry: RetryPolicy::with_max_retries(1),
            logging: LoggingConfig {
                level: LogLevel::Debug,
                colored: false,
                include_timestamps: false,
                include_targets: true,
            },
        }
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.workers.num_workers == 0 {
            errors.push("Number of workers must be greater than 0".to_string());
        }

        if self.workers.num_workers > 1000 {
            errors.push("Number of workers should not exceed 1000".to_string());
        }

        if self.queue.capacity == 0 {
            errors.push("Queue capacity must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(input: &str) -> PoolResult<Self> {
        let config: PoolConfig = serde_json::from_str(input)?;
        config
            .validate()
            .map_err(|errors| PoolError::config(errors.join("; ")))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.workers.num_workers, 10);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.queue.capacity, 100);
        assert_eq!(config.queue.overflow, OverflowPolicy::Block);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        let development = PoolConfig::development();
        assert_eq!(development.workers.num_workers, 2);
        assert!(matches!(development.logging.level, LogLevel::Debug));
        assert!(development.validate().is_ok());

        let production = PoolConfig::production();
        assert!(production.workers.num_workers >= 2);
        assert!(production.validate().is_ok());

        let testing = PoolConfig::testing();
        assert_eq!(testing.workers.num_workers, 1);
        assert!(testing.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PoolConfig::default();
        assert!(config.validate().is_ok());

        config.workers.num_workers = 0;
        config.queue.capacity = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("workers")));
        assert!(errors.iter().any(|e| e.contains("capacity")));
    }

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::Trace.as_directive(), "trace");
        assert_eq!(LogLevel::Warn.as_directive(), "warn");

        let logging: LoggingConfig = serde_json::from_str(r#"{"level": "error"}"#).unwrap();
        assert_eq!(logging.level, LogLevel::Error);
        assert_eq!(logging.level.as_directive(), "error");
        assert!(logging.colored);
    }

    #[test]
    fn test_retry_policy_attempts() {
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
        assert_eq!(RetryPolicy::with_max_retries(3).max_attempts(), 4);
        assert_eq!(RetryPolicy::with_max_retries(u32::MAX).max_attempts(), u32::MAX);
    }

    #[test]
    fn test_builders() {
        let config = PoolConfig::default()
            .with_workers(3)
            .with_max_retries(0)
            .with_capacity(2)
            .with_overflow(OverflowPolicy::Reject);

        assert_eq!(config.workers.num_workers, 3);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.queue.capacity, 2);
        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_from_json_partial() {
        let config = PoolConfig::from_json_str(
            r#"{"workers": {"num_workers": 4}, "queue": {"overflow": "reject"}}"#,
        )
        .unwrap();

        assert_eq!(config.workers.num_workers, 4);
        assert_eq!(config.queue.capacity, 100);
        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = PoolConfig::from_json_str(r#"{"queue": {"capacity": 0}}"#).unwrap_err();
        assert!(matches!(err, PoolError::ConfigError { .. }));

        let err = PoolConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, PoolError::SerializationError(_)));
    }
}
