//! modlog Core
//!
//! Backend-agnostic log handling for modular hosts.
//! Modules report info/warn/error messages and structured fatal failures
//! through a `LogDispatcher`; the dispatcher fans each event out to every
//! registered `LogHandler` (console, crash reporter, telemetry, ...)
//! synchronously on the caller's thread.
//!
//! ## Dispatching
//!
//! ```rust
//! use std::sync::Arc;
//! use modlog_core::{LogDispatcher, LogHandler, ConsoleHandler, RecordingHandler, Failure};
//!
//! let dispatcher = Arc::new(LogDispatcher::new());
//! let capture = Arc::new(RecordingHandler::new("capture"));
//! dispatcher.register(Arc::new(ConsoleHandler::with_prefix("[camera]"))).unwrap();
//! dispatcher.register(capture.clone()).unwrap();
//!
//! // Modules only need something that implements LogHandler
//! dispatcher.warn("frame dropped");
//! dispatcher.fatal(&Failure::new("camera", 42, "sensor disconnected"));
//!
//! assert_eq!(capture.len(), 2);
//! dispatcher.shutdown();
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use modlog_core::{DispatcherConfig, HandlerRegistry};
//!
//! let config = DispatcherConfig::from_yaml_str("handlers:\n  - kind: noop\n").unwrap();
//! let dispatcher = config.build(&HandlerRegistry::with_builtins()).unwrap();
//! assert_eq!(dispatcher.len(), 1);
//! ```

pub mod types;
pub mod handlers;
pub mod dispatch;
pub mod config;
pub mod diagnostics;

// Re-export commonly used types
pub use types::{Severity, ParseSeverityError, LogEvent, Failure, FailureCode};

pub use handlers::{
    LogHandler, LogHandlerExt, SharedHandler, BoxedHandler,
    ConsoleHandler, NoOpHandler, RecordingHandler,
    HandlerRegistry,
};

pub use dispatch::{
    LogDispatcher, HandlerId, DispatchReport, DispatchError, DispatchResult,
    Subscription, LifecycleObserver,
};

pub use config::{DispatcherConfig, HandlerSpec, ConfigError, ConfigResult};
