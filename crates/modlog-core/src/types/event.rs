//! Log event values

use serde::{Deserialize, Serialize};

use super::failure::Failure;
use super::severity::Severity;

/// A single event on its way to the handlers
///
/// Message severities carry text; only `Fatal` carries a structured
/// [`Failure`]. Events are not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "severity", content = "payload", rename_all = "lowercase")]
pub enum LogEvent {
    Info(String),
    Warn(String),
    Error(String),
    Fatal(Failure),
}

impl LogEvent {
    pub fn info(message: impl Into<String>) -> Self {
        LogEvent::Info(message.into())
    }

    pub fn warn(message: impl Into<String>) -> Self {
        LogEvent::Warn(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        LogEvent::Error(message.into())
    }

    pub fn fatal(failure: Failure) -> Self {
        LogEvent::Fatal(failure)
    }

    pub fn severity(&self) -> Severity {
        match self {
            LogEvent::Info(_) => Severity::Info,
            LogEvent::Warn(_) => Severity::Warn,
            LogEvent::Error(_) => Severity::Error,
            LogEvent::Fatal(_) => Severity::Fatal,
        }
    }

    /// Text of a message event, `None` for fatal events
    pub fn message(&self) -> Option<&str> {
        match self {
            LogEvent::Info(m) | LogEvent::Warn(m) | LogEvent::Error(m) => Some(m),
            LogEvent::Fatal(_) => None,
        }
    }

    /// Failure of a fatal event, `None` for message events
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            LogEvent::Fatal(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event = LogEvent::warn("low disk");
        assert_eq!(event.severity(), Severity::Warn);
        assert_eq!(event.message(), Some("low disk"));
        assert!(event.failure().is_none());

        let fatal = LogEvent::fatal(Failure::new("X", 42, "boom"));
        assert_eq!(fatal.severity(), Severity::Fatal);
        assert!(fatal.message().is_none());
        assert_eq!(fatal.failure().unwrap().domain(), "X");
    }

    #[test]
    fn test_event_json() {
        let json = serde_json::to_value(LogEvent::info("hello")).unwrap();
        assert_eq!(json["severity"], "info");
        assert_eq!(json["payload"], "hello");
    }
}
