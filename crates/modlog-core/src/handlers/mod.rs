//! Log handler contract and built-in backends
//!
//! - `LogHandler` trait for implementing backends
//! - Built-in implementations: `ConsoleHandler`, `NoOpHandler`, `RecordingHandler`
//! - `HandlerRegistry` for creating handlers by kind name

mod traits;
mod noop;
mod console;
mod recording;
mod registry;

pub use traits::{LogHandler, LogHandlerExt, BoxedHandler, SharedHandler};
pub use noop::NoOpHandler;
pub use console::ConsoleHandler;
pub use recording::RecordingHandler;
pub use registry::{HandlerRegistry, HandlerDefinition, HandlerFactory};
