//! Logging collaborator injected into the client.
//!
//! The client never touches global logging state. It reports through a
//! [`Logger`] handed to it in [`ClientConfig`](crate::client::ClientConfig);
//! the default forwards to `tracing`.

/// Sink for client diagnostics.
pub trait Logger: Send + Sync {
    /// Verbose diagnostics (endpoints, truncated bodies).
    fn debug(&self, message: &str);
    /// Request/response lifecycle.
    fn info(&self, message: &str);
    /// Non-2xx responses other than 5xx, rejected signatures.
    fn warn(&self, message: &str);
    /// 5xx responses, transport and decode failures.
    fn error(&self, message: &str);
}

/// Forwards to the `tracing` macros under the `monobank` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "monobank", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "monobank", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "monobank", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "monobank", "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}


#[cfg(test)]
mod tests {
    use super::testing::{Level, RecordingLogger};
    use super::*;

    #[test]
    fn test_recording_logger_levels() {
        let logger = RecordingLogger::default();
        logger.warn("HTTP response: non-2xx status=404");
        logger.error("HTTP response: non-2xx status=503");

        assert!(logger.has(Level::Warn, "status=404"));
        assert!(logger.has(Level::Error, "status=503"));
        assert!(!logger.has(Level::Info, "status"));
    }

    #[test]
    fn test_builtin_loggers_accept_messages() {
        let loggers: Vec<Box<dyn Logger>> = vec![Box::new(TracingLogger), Box::new(NoopLogger)];
        for logger in loggers {
            logger.debug("debug");
            logger.info("info");
            logger.warn("warn");
            logger.error("error");
        }
    }
}
