//! Dispatcher error types

use thiserror::Error;

/// Errors reported by dispatcher operations
///
/// These describe problems with the dispatcher itself. Failures inside a
/// handler are never reported through this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher has been shut down
    #[error("Dispatcher is shut down")]
    ShutDown,

    /// The handler reported itself unavailable at registration time
    #[error("Handler not available: {0}")]
    Unavailable(String),

    /// The handler is this dispatcher, or a dispatcher that would deliver
    /// back into it
    #[error("Dispatcher cannot be registered with itself")]
    SelfRegistration,

    /// A handler dispatched into a dispatcher that is already delivering on
    /// the same thread; the event was dropped
    #[error("Dispatcher re-entered during delivery")]
    Reentrant,
}

pub type DispatchResult<T> = Result<T, DispatchError>;
