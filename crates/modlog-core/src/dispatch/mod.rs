//! Event dispatch
//!
//! `LogDispatcher` holds the active handler set and broadcasts each event
//! to all of it, synchronously, on the caller's thread.
//!
//! - `Subscription`: handle returned by `subscribe` that removes its handler
//! - `LifecycleObserver`: hears when the handler set becomes non-empty or empty

mod error;
mod dispatcher;
mod observer;
mod subscription;

pub use error::{DispatchError, DispatchResult};
pub use dispatcher::{LogDispatcher, HandlerId, DispatchReport};
pub use observer::LifecycleObserver;
pub use subscription::Subscription;
