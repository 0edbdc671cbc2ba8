//! Core types: severities, events and structured failures

mod severity;
mod failure;
mod event;

pub use severity::{Severity, ParseSeverityError};
pub use failure::{Failure, FailureCode, Causes};
pub use event::LogEvent;
