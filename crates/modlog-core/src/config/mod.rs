//! Configuration
//!
//! - `DispatcherConfig`: YAML/JSON description of which handlers to register
//! - `HandlerSpec`: one handler entry, resolved through a `HandlerRegistry`

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{DispatcherConfig, HandlerSpec};
