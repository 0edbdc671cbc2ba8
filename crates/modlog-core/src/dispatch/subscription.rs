//! Removable registration handle

use std::sync::Weak;

use super::dispatcher::{HandlerId, LogDispatcher};

/// A registration that can remove itself
///
/// Returned by [`LogDispatcher::subscribe`]. The handle holds the dispatcher
/// weakly, so it never keeps a dispatcher alive. Dropping a subscription
/// does not deregister; call [`remove`](Self::remove).
///
/// Registration is deduplicated by identity, so subscribing the same handler
/// twice yields two handles for one registration; removing either removes it.
#[derive(Debug)]
pub struct Subscription {
    id: HandlerId,
    dispatcher: Weak<LogDispatcher>,
}

impl Subscription {
    pub(crate) fn new(id: HandlerId, dispatcher: Weak<LogDispatcher>) -> Self {
        Self { id, dispatcher }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Deregister the handler
    ///
    /// Returns true if this call removed it. Removing again, or after the
    /// dispatcher was dropped or shut down, does nothing and returns false.
    pub fn remove(&self) -> bool {
        self.dispatcher
            .upgrade()
            .and_then(|dispatcher| dispatcher.deregister_id(self.id).ok())
            .unwrap_or(false)
    }

    /// Whether the handler is still registered
    pub fn is_active(&self) -> bool {
        self.dispatcher
            .upgrade()
            .map(|dispatcher| dispatcher.contains_id(self.id))
            .unwrap_or(false)
    }
}
