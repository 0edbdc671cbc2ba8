//! No-op handler implementation

use super::traits::LogHandler;
use crate::types::Failure;

/// A handler that does nothing
///
/// Useful for testing or as a placeholder backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl NoOpHandler {
    /// Create a new no-op handler
    pub fn new() -> Self {
        Self
    }
}

impl LogHandler for NoOpHandler {
    fn name(&self) -> &str {
        "noop"
    }

    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn fatal(&self, _failure: &Failure) {}
}
