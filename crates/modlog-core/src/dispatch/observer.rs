//! Lifecycle hooks for a dispatcher's handler set

/// Notified when a dispatcher gains its first handler or loses its last
///
/// Hosts use this to start an expensive event source only while someone is
/// listening. `activated` fires when the set goes from empty to non-empty,
/// `deactivated` when it goes back to empty, whether through
/// `deregister`, `clear` or `shutdown`.
///
/// Callbacks run on the thread that made the change, after the dispatcher's
/// lock is released, so they may call back into the dispatcher. A panic is
/// contained and logged.
pub trait LifecycleObserver: Send + Sync {
    /// The first handler was registered
    fn activated(&self);

    /// The last handler was removed
    fn deactivated(&self);
}
