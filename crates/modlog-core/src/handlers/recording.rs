//! In-memory recording handler

use parking_lot::Mutex;

use super::traits::LogHandler;
use crate::types::{Failure, LogEvent, Severity};

/// Handler that keeps every event it receives, in arrival order
///
/// Intended for capture in tests and for hosts that want to inspect what
/// was logged during a short operation. Events are lost when the handler is
/// dropped.
///
/// # Example
///
/// ```
/// use modlog_core::handlers::{LogHandler, RecordingHandler};
/// use modlog_core::types::Severity;
///
/// let recorder = RecordingHandler::new("capture");
/// recorder.warn("low disk");
/// assert_eq!(recorder.count(Severity::Warn), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingHandler {
    label: String,
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingHandler {
    /// Create a new empty recorder
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Number of recorded events with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity() == severity)
            .count()
    }

    /// Texts of recorded message events with the given severity
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.severity() == severity)
            .filter_map(|e| e.message().map(str::to_string))
            .collect()
    }

    /// Recorded fatal failures
    pub fn failures(&self) -> Vec<Failure> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.failure().cloned())
            .collect()
    }

    fn record(&self, event: LogEvent) {
        self.events.lock().push(event);
    }
}

impl LogHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.label
    }

    fn info(&self, message: &str) {
        self.record(LogEvent::info(message));
    }

    fn warn(&self, message: &str) {
        self.record(LogEvent::warn(message));
    }

    fn error(&self, message: &str) {
        self.record(LogEvent::error(message));
    }

    fn fatal(&self, failure: &Failure) {
        self.record(LogEvent::fatal(failure.clone()));
    }
}
