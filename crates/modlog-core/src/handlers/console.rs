//! Console handler implementation

use std::io::{self, Write};

use super::traits::LogHandler;
use crate::types::{Failure, Severity};

/// A handler that writes to the console (stdout/stderr)
///
/// `info` goes to stdout, everything else to stderr. Write errors (closed
/// pipe, etc.) are dropped.
#[derive(Debug, Clone)]
pub struct ConsoleHandler {
    prefix: String,
}

impl Default for ConsoleHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleHandler {
    /// Create a new console handler with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "[modlog]".to_string(),
        }
    }

    /// Create a console handler with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn format_line(&self, severity: Severity, text: &str) -> String {
        format!("{} {}: {}", self.prefix, severity, text)
    }

    fn format_failure(&self, failure: &Failure) -> String {
        let mut out = self.format_line(Severity::Fatal, &failure.to_string());
        for (key, value) in failure.details() {
            out.push_str(&format!("\n    {} = {}", key, value));
        }
        for cause in failure.causes() {
            out.push_str(&format!("\n    caused by: {}", cause));
        }
        out
    }

    fn write_stdout(&self, line: &str) {
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }

    fn write_stderr(&self, line: &str) {
        let _ = writeln!(io::stderr().lock(), "{}", line);
    }
}

impl LogHandler for ConsoleHandler {
    fn name(&self) -> &str {
        "console"
    }

    fn info(&self, message: &str) {
        self.write_stdout(&self.format_line(Severity::Info, message));
    }

    fn warn(&self, message: &str) {
        self.write_stderr(&self.format_line(Severity::Warn, message));
    }

    fn error(&self, message: &str) {
        self.write_stderr(&self.format_line(Severity::Error, message));
    }

    fn fatal(&self, failure: &Failure) {
        self.write_stderr(&self.format_failure(failure));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_handler_creation() {
        let handler = ConsoleHandler::new();
        assert_eq!(handler.prefix(), "[modlog]");

        let custom = ConsoleHandler::with_prefix("[camera]");
        assert_eq!(custom.prefix(), "[camera]");
    }

    #[test]
    fn test_line_format() {
        let handler = ConsoleHandler::with_prefix("[app]");
        assert_eq!(handler.format_line(Severity::Warn, "low disk"), "[app] WARN: low disk");
    }

    #[test]
    fn test_failure_format() {
        let handler = ConsoleHandler::with_prefix("[app]");
        let failure = Failure::new("storage", 5, "write failed")
            .with_detail("path", "/data")
            .with_underlying(Failure::new("io", "ENOSPC", "no space left"));

        assert_eq!(
            handler.format_failure(&failure),
            "[app] FATAL: storage (5): write failed\n    path = /data\n    caused by: io (ENOSPC): no space left"
        );
    }

    #[test]
    fn test_console_handler_logs() {
        // This test just verifies the handler doesn't panic
        let handler = ConsoleHandler::new();
        handler.info("info message");
        handler.warn("warn message");
        handler.error("error message");
        handler.fatal(&Failure::new("test", 1, "fatal message"));
    }
}
