//! LogHandler trait definition

use std::sync::Arc;

use crate::dispatch::LogDispatcher;
use crate::types::{Failure, LogEvent};

/// Backend-agnostic log handler
///
/// One operation per severity. Message severities receive text, `fatal`
/// receives a structured [`Failure`].
///
/// Implementations:
/// - `ConsoleHandler`: Writes to stdout/stderr
/// - `NoOpHandler`: Discards everything
/// - `RecordingHandler`: Keeps events in memory
/// - `LogDispatcher`: Fans out to its registered handlers
/// - Host backends: remote telemetry, crash reporters, etc.
///
/// # Failure containment
///
/// A handler owns its failures. I/O errors must be swallowed (or reported
/// somewhere other than back to the caller) and a handler must not panic.
/// The dispatcher contains panics anyway so that one broken handler cannot
/// starve the others.
///
/// `fatal` reports; it does not terminate. A handler may escalate (e.g.
/// flush a crash report and abort) as its own side effect.
pub trait LogHandler: Send + Sync {
    /// Human-readable name of this handler
    fn name(&self) -> &str {
        "handler"
    }

    /// Whether this handler can accept events
    ///
    /// The dispatcher refuses to register unavailable handlers.
    fn is_available(&self) -> bool {
        true
    }

    /// The dispatcher behind this handler, if it is one
    ///
    /// Used at registration time to refuse dispatcher cycles.
    fn as_dispatcher(&self) -> Option<&LogDispatcher> {
        None
    }

    /// Handle an advisory message
    fn info(&self, message: &str);

    /// Handle a warning
    fn warn(&self, message: &str);

    /// Handle a recoverable error already dealt with by the caller
    fn error(&self, message: &str);

    /// Handle an unrecoverable failure
    fn fatal(&self, failure: &Failure);
}

/// Type alias for a boxed handler, see `LogDispatcher::register_boxed`
pub type BoxedHandler = Box<dyn LogHandler>;

/// Type alias for an Arc-wrapped handler
pub type SharedHandler = Arc<dyn LogHandler>;

impl<T: LogHandler + ?Sized> LogHandler for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn as_dispatcher(&self) -> Option<&LogDispatcher> {
        (**self).as_dispatcher()
    }

    fn info(&self, message: &str) {
        (**self).info(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn fatal(&self, failure: &Failure) {
        (**self).fatal(failure)
    }
}

/// Extension trait for routing events and logging with format arguments
pub trait LogHandlerExt: LogHandler {
    /// Route an event to the operation matching its severity
    fn handle(&self, event: &LogEvent) {
        match event {
            LogEvent::Info(message) => self.info(message),
            LogEvent::Warn(message) => self.warn(message),
            LogEvent::Error(message) => self.error(message),
            LogEvent::Fatal(failure) => self.fatal(failure),
        }
    }

    /// Log an info message with format arguments
    fn info_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.info(&args.to_string());
    }

    /// Log a warning message with format arguments
    fn warn_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.warn(&args.to_string());
    }

    /// Log an error message with format arguments
    fn error_fmt(&self, args: std::fmt::Arguments<'_>) {
        self.error(&args.to_string());
    }
}

// Implement LogHandlerExt for all LogHandler implementations
impl<T: LogHandler + ?Sized> LogHandlerExt for T {}

/// Convenience macros for logging through any handler or dispatcher
#[macro_export]
macro_rules! log_info {
    ($handler:expr, $($arg:tt)*) => {{
        use $crate::handlers::LogHandler as _;
        $handler.info(&format!($($arg)*))
    }};
}

#[macro_export]
macro_rules! log_warn {
    ($handler:expr, $($arg:tt)*) => {{
        use $crate::handlers::LogHandler as _;
        $handler.warn(&format!($($arg)*))
    }};
}

#[macro_export]
macro_rules! log_error {
    ($handler:expr, $($arg:tt)*) => {{
        use $crate::handlers::LogHandler as _;
        $handler.error(&format!($($arg)*))
    }};
}

/// Report a fatal failure: `log_fatal!(handler, domain, code, "fmt", args...)`
#[macro_export]
macro_rules! log_fatal {
    ($handler:expr, $domain:expr, $code:expr, $($arg:tt)*) => {{
        use $crate::handlers::LogHandler as _;
        $handler.fatal(&$crate::types::Failure::new($domain, $code, format!($($arg)*)))
    }};
}
