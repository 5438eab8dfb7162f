//! Logging for tqwp.
//!
//! Two layers live here:
//!
//! - [`PoolLogger`], the narrow sink the pool reports task outcomes to. The
//!   pool is handed one at construction and never depends on what it does.
//! - [`init_tracing`], which installs a `tracing` subscriber for the crate's
//!   own diagnostics.

use crate::config::LoggingConfig;
use chrono::Local;
use std::io::Write;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Leveled message sink consumed by the worker pool.
pub trait PoolLogger: Send + Sync {
    /// Informational message
    fn info(&self, message: &str);
    /// Something went wrong but will be handled
    fn warn(&self, message: &str);
    /// Something went wrong for good
    fn error(&self, message: &str);
    /// A unit of work completed
    fn success(&self, message: &str);
    /// Free-form message with a caller-chosen tag
    fn tagged(&self, tag: &str, message: &str);
}

/// Forwards every message to `tracing`. This is the default logger.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PoolLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn success(&self, message: &str) {
        tracing::info!(outcome = "success", "{}", message);
    }

    fn tagged(&self, tag: &str, message: &str) {
        tracing::info!(tag, "{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl PoolLogger for NoopLogger {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn tagged(&self, _tag: &str, _message: &str) {}
}

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Writes `[LEVEL] 2024/01/31 09:15:00 message` lines to a writer.
///
/// Write errors are ignored.
pub struct ConsoleLogger {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleLogger {
    /// Log to standard output
    pub fn stdout() -> Self {
        Self::with_writer(std::io::stdout())
    }

    /// Log to an arbitrary writer
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    fn write_line(&self, tag: &str, message: &str) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{tag} {timestamp} {message}");
            let _ = out.flush();
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleLogger").finish_non_exhaustive()
    }
}

impl PoolLogger for ConsoleLogger {
    fn info(&self, message: &str) {
        self.write_line("[INFO]", message);
    }

    fn warn(&self, message: &str) {
        self.write_line("[WARN]", message);
    }

    fn error(&self, message: &str) {
        self.write_line("[ERROR]", message);
    }

    fn success(&self, message: &str) {
        self.write_line("[SUCCESS]", message);
    }

    fn tagged(&self, tag: &str, message: &str) {
        self.write_line(tag, message);
    }
}

/// Install a global `tracing` subscriber configured from `config`.
///
/// `RUST_LOG`, when set, takes precedence over the configured level. Returns
/// `false` when a subscriber was already installed, in which case nothing
/// changes.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored)
        .with_target(config.include_targets);

    let result = if config.include_timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    #[test]
    fn test_console_logger_levels() {
        let buffer = SharedBuffer::default();
        let logger = ConsoleLogger::with_writer(buffer.clone());

        logger.info("pool started");
        logger.warn("retrying");
        logger.error("gave up");
        logger.success("done");
        logger.tagged("[SUMMARY]", "10 processed");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("[INFO] "));
        assert!(lines[1].starts_with("[WARN] "));
        assert!(lines[2].starts_with("[ERROR] "));
        assert!(lines[3].starts_with("[SUCCESS] "));
        assert!(lines[4].starts_with("[SUMMARY] "));
        assert!(lines[4].ends_with(" 10 processed"));
    }

    #[test]
    fn test_console_logger_timestamp_shape() {
        let buffer = SharedBuffer::default();
        let logger = ConsoleLogger::with_writer(buffer.clone());
        logger.info("hello");

        let line = &buffer.lines()[0];
        // "[INFO] " + "yyyy/mm/dd HH:MM:SS" + " hello"
        let timestamp = &line["[INFO] ".len().."[INFO] ".len() + 19];
        assert!(chrono::NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_ok());
        assert!(line.ends_with(" hello"));
    }

    #[test]
    fn test_silent_loggers_accept_everything() {
        let loggers: Vec<Box<dyn PoolLogger>> = vec![Box::new(NoopLogger), Box::new(TracingLogger)];
        for logger in loggers {
            logger.info("i");
            logger.warn("w");
            logger.error("e");
            logger.success("s");
            logger.tagged("t", "m");
        }
    }
}
