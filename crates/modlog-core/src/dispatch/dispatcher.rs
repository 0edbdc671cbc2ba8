//! Synchronous fan-out dispatcher

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{DispatchError, DispatchResult};
use super::observer::LifecycleObserver;
use super::subscription::Subscription;
use crate::handlers::{BoxedHandler, LogHandler, LogHandlerExt, SharedHandler};
use crate::types::{Failure, LogEvent, Severity};
use crate::{debug_log, info_log, warn_log};

/// Identifier assigned to a handler when it is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a single dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned normally
    pub delivered: usize,
    /// Handlers that panicked; the panic was contained
    pub contained: usize,
}

impl DispatchReport {
    /// Number of handlers the event was offered to
    pub fn total(&self) -> usize {
        self.delivered + self.contained
    }
}

#[derive(Clone)]
struct Entry {
    id: HandlerId,
    handler: SharedHandler,
}

/// Address of the handler's data, ignoring the vtable
fn identity(handler: &SharedHandler) -> *const () {
    Arc::as_ptr(handler) as *const ()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

thread_local! {
    // Dispatchers currently fanning out on this thread
    static DELIVERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a dispatcher as delivering on the current thread until dropped
struct DeliveryGuard {
    addr: usize,
}

impl DeliveryGuard {
    /// Returns `None` if the dispatcher is already delivering on this thread
    fn enter(addr: usize) -> Option<Self> {
        DELIVERING.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&addr) {
                None
            } else {
                active.push(addr);
                Some(Self { addr })
            }
        })
    }
}

impl Drop for DeliveryGuard {
    fn drop(&mut self) {
        DELIVERING.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|a| *a == self.addr) {
                active.remove(pos);
            }
        });
    }
}

/// Broadcasts events to every registered handler
///
/// Handlers are held as shared references in registration order. The set
/// is an immutable snapshot swapped under a lock: `dispatch` grabs the
/// current snapshot and releases the lock before calling any handler, so a
/// dispatch in progress always sees a consistent set and handlers may call
/// back into the dispatcher.
///
/// Registration is deduplicated by identity: registering the same `Arc`
/// twice returns the existing [`HandlerId`] and delivers once.
///
/// Dispatchers nest (a dispatcher is a `LogHandler`), but never in a loop.
/// `register` refuses a dispatcher that would deliver back into this one,
/// and a dispatch that re-enters a dispatcher already delivering on the same
/// thread is dropped with [`DispatchError::Reentrant`].
///
/// The dispatcher is a plain value. Hosts construct it at module start-up,
/// share it as `Arc<LogDispatcher>`, and call [`LogDispatcher::shutdown`] at
/// teardown.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use modlog_core::dispatch::LogDispatcher;
/// use modlog_core::handlers::RecordingHandler;
/// use modlog_core::types::{Failure, LogEvent, Severity};
///
/// let dispatcher = LogDispatcher::new();
/// let recorder = Arc::new(RecordingHandler::new("capture"));
/// dispatcher.register(recorder.clone()).unwrap();
///
/// dispatcher.dispatch(&LogEvent::warn("low disk")).unwrap();
/// dispatcher.dispatch(&LogEvent::fatal(Failure::new("storage", 28, "no space"))).unwrap();
///
/// assert_eq!(recorder.count(Severity::Warn), 1);
/// assert_eq!(recorder.failures().len(), 1);
/// ```
pub struct LogDispatcher {
    // None once shut down
    handlers: RwLock<Option<Arc<Vec<Entry>>>>,
    observer: RwLock<Option<Arc<dyn LifecycleObserver>>>,
    next_id: AtomicU64,
}

impl Default for LogDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDispatcher {
    /// Create a dispatcher with no handlers
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Some(Arc::new(Vec::new()))),
            observer: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a dispatcher that reports its lifecycle to `observer`
    pub fn with_observer(observer: Arc<dyn LifecycleObserver>) -> Self {
        let dispatcher = Self::new();
        dispatcher.set_observer(observer);
        dispatcher
    }

    fn addr(&self) -> usize {
        self as *const Self as usize
    }

    fn snapshot(&self) -> Option<Arc<Vec<Entry>>> {
        self.handlers.read().clone()
    }

    /// Whether delivering to this dispatcher can reach the dispatcher at `target`
    fn reaches(&self, target: usize, visited: &mut Vec<usize>) -> bool {
        let addr = self.addr();
        if addr == target {
            return true;
        }
        if visited.contains(&addr) {
            return false;
        }
        visited.push(addr);

        let Some(handlers) = self.snapshot() else {
            return false;
        };
        handlers.iter().any(|e| {
            e.handler
                .as_dispatcher()
                .map(|nested| nested.reaches(target, visited))
                .unwrap_or(false)
        })
    }

    /// Register a handler
    ///
    /// Returns the handler's id. Registering an instance that is already
    /// present is a no-op returning its existing id.
    ///
    /// # Errors
    /// - `SelfRegistration` if `handler` is this dispatcher, or a dispatcher
    ///   that already delivers into this one
    /// - `ShutDown` after [`shutdown`](Self::shutdown)
    /// - `Unavailable` if the handler's `is_available()` is false
    pub fn register(&self, handler: SharedHandler) -> DispatchResult<HandlerId> {
        if let Some(nested) = handler.as_dispatcher() {
            if nested.reaches(self.addr(), &mut Vec::new()) {
                warn_log!("refusing dispatcher registration that would form a cycle");
                return Err(DispatchError::SelfRegistration);
            }
        }
        if self.is_shut_down() {
            return Err(DispatchError::ShutDown);
        }
        // Ask before taking the lock; the handler may re-enter
        if !handler.is_available() {
            let name = handler.name().to_string();
            warn_log!("refusing unavailable handler {}", name);
            return Err(DispatchError::Unavailable(name));
        }

        let mut guard = self.handlers.write();
        let current = guard.as_ref().ok_or(DispatchError::ShutDown)?;

        let key = identity(&handler);
        if let Some(existing) = current.iter().find(|e| identity(&e.handler) == key) {
            let id = existing.id;
            drop(guard);
            debug_log!("handler {} already registered as {}", handler.name(), id);
            return Ok(id);
        }

        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(Entry {
            id,
            handler: handler.clone(),
        });
        let count = next.len();
        *guard = Some(Arc::new(next));
        drop(guard);

        debug_log!("registered handler {} as {} ({} active)", handler.name(), id, count);
        if count == 1 {
            self.notify(true);
        }
        Ok(id)
    }

    /// Register a handler the caller does not keep a reference to
    ///
    /// The dispatcher takes ownership; remove it again with
    /// [`deregister_id`](Self::deregister_id).
    pub fn register_boxed(&self, handler: BoxedHandler) -> DispatchResult<HandlerId> {
        self.register(Arc::from(handler))
    }

    /// Register a handler and get back a [`Subscription`] that can remove it
    ///
    /// The subscription holds the dispatcher weakly. Dropping it leaves the
    /// handler registered.
    pub fn subscribe(self: &Arc<Self>, handler: SharedHandler) -> DispatchResult<Subscription> {
        let id = self.register(handler)?;
        Ok(Subscription::new(id, Arc::downgrade(self)))
    }

    /// Remove a handler by identity
    ///
    /// Returns `Ok(false)` if the handler was not registered. Once this
    /// returns, later dispatches never reach the handler.
    pub fn deregister(&self, handler: &SharedHandler) -> DispatchResult<bool> {
        let key = identity(handler);
        self.remove_where(|e| identity(&e.handler) == key)
    }

    /// Remove a handler by the id returned from [`register`](Self::register)
    pub fn deregister_id(&self, id: HandlerId) -> DispatchResult<bool> {
        self.remove_where(|e| e.id == id)
    }

    fn remove_where(&self, matches: impl Fn(&Entry) -> bool) -> DispatchResult<bool> {
        let mut guard = self.handlers.write();
        let current = guard.as_ref().ok_or(DispatchError::ShutDown)?;

        let Some(pos) = current.iter().position(|e| matches(e)) else {
            return Ok(false);
        };

        let mut next: Vec<Entry> = current.iter().cloned().collect();
        let removed = next.remove(pos);
        let emptied = next.is_empty();
        *guard = Some(Arc::new(next));
        drop(guard);

        debug_log!("deregistered handler {} ({})", removed.handler.name(), removed.id);
        if emptied {
            self.notify(false);
        }
        Ok(true)
    }

    /// Deregister every handler, returning how many were removed
    pub fn clear(&self) -> DispatchResult<usize> {
        let mut guard = self.handlers.write();
        let count = guard.as_ref().ok_or(DispatchError::ShutDown)?.len();
        *guard = Some(Arc::new(Vec::new()));
        drop(guard);

        debug_log!("cleared {} handlers", count);
        if count > 0 {
            self.notify(false);
        }
        Ok(count)
    }

    /// Tear the dispatcher down
    ///
    /// Drops the dispatcher's references to all handlers and to its
    /// observer, and returns how many handlers there were. Afterwards
    /// `register`, `deregister` and `dispatch` report `ShutDown`. Calling it
    /// again returns 0.
    pub fn shutdown(&self) -> usize {
        let previous = self.handlers.write().take();
        let count = match previous {
            Some(handlers) => {
                info_log!("dispatcher shut down with {} handlers", handlers.len());
                handlers.len()
            }
            None => 0,
        };
        if count > 0 {
            self.notify(false);
        }
        self.observer.write().take();
        count
    }

    pub fn is_shut_down(&self) -> bool {
        self.handlers.read().is_none()
    }

    /// Install the lifecycle observer, replacing any previous one
    ///
    /// The observer hears about later transitions only; installing it on a
    /// dispatcher that already has handlers does not call `activated`.
    pub fn set_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Remove the lifecycle observer
    pub fn clear_observer(&self) {
        self.observer.write().take();
    }

    // Called with no lock held. Under concurrent mutation two transitions
    // may reach the observer in either order.
    fn notify(&self, activated: bool) {
        let Some(observer) = self.observer.read().clone() else {
            return;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            if activated {
                observer.activated()
            } else {
                observer.deactivated()
            }
        }));
        if let Err(payload) = result {
            warn_log!("lifecycle observer panicked: {}", panic_message(payload.as_ref()));
        }
    }

    /// Deliver an event to every registered handler
    ///
    /// Handlers run synchronously on the calling thread, in registration
    /// order, each exactly once. A handler that panics is skipped over and
    /// counted in [`DispatchReport::contained`]; the remaining handlers still
    /// receive the event.
    ///
    /// # Errors
    /// - `ShutDown` after [`shutdown`](Self::shutdown)
    /// - `Reentrant` if called from inside one of this dispatcher's own
    ///   handlers; the event is dropped
    pub fn dispatch(&self, event: &LogEvent) -> DispatchResult<DispatchReport> {
        self.fan_out(event.severity(), |handler| handler.handle(event))
    }

    fn fan_out(
        &self,
        severity: Severity,
        deliver: impl Fn(&SharedHandler),
    ) -> DispatchResult<DispatchReport> {
        let handlers = self.snapshot().ok_or(DispatchError::ShutDown)?;
        let Some(_delivering) = DeliveryGuard::enter(self.addr()) else {
            warn_log!("dropped {} event re-entering a dispatcher mid-delivery", severity);
            return Err(DispatchError::Reentrant);
        };

        let mut report = DispatchReport::default();
        for entry in handlers.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| deliver(&entry.handler))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.contained += 1;
                    warn_log!(
                        "handler {} ({}) panicked on {} event: {}",
                        entry.handler.name(),
                        entry.id,
                        severity,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        Ok(report)
    }

    /// Number of registered handlers (0 after shutdown)
    pub fn len(&self) -> usize {
        self.snapshot().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether a handler instance is registered
    pub fn contains(&self, handler: &SharedHandler) -> bool {
        let key = identity(handler);
        self.snapshot()
            .map(|h| h.iter().any(|e| identity(&e.handler) == key))
            .unwrap_or(false)
    }

    /// Check whether the handler registered under `id` is still present
    pub fn contains_id(&self, id: HandlerId) -> bool {
        self.snapshot()
            .map(|h| h.iter().any(|e| e.id == id))
            .unwrap_or(false)
    }

    /// Names of registered handlers, in registration order
    pub fn handler_names(&self) -> Vec<String> {
        self.snapshot()
            .map(|h| h.iter().map(|e| e.handler.name().to_string()).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for LogDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogDispatcher")
            .field("handlers", &self.handler_names())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// A dispatcher is itself a handler, so it can be passed to code that only
/// knows about `LogHandler` or nested inside another dispatcher. Events sent
/// after shutdown, or that would loop back into a dispatcher mid-delivery,
/// are dropped.
impl LogHandler for LogDispatcher {
    fn name(&self) -> &str {
        "dispatcher"
    }

    fn is_available(&self) -> bool {
        !self.is_shut_down()
    }

    fn as_dispatcher(&self) -> Option<&LogDispatcher> {
        Some(self)
    }

    fn info(&self, message: &str) {
        let _ = self.fan_out(Severity::Info, |h| h.info(message));
    }

    fn warn(&self, message: &str) {
        let _ = self.fan_out(Severity::Warn, |h| h.warn(message));
    }

    fn error(&self, message: &str) {
        let _ = self.fan_out(Severity::Error, |h| h.error(message));
    }

    fn fatal(&self, failure: &Failure) {
        let _ = self.fan_out(Severity::Fatal, |h| h.fatal(failure));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{NoOpHandler, RecordingHandler};
    use parking_lot::Mutex;
    use std::thread;

    fn recorder(label: &str) -> Arc<RecordingHandler> {
        Arc::new(RecordingHandler::new(label))
    }

    /// Panics on every operation
    struct Exploding;

    impl LogHandler for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn info(&self, _message: &str) {
            panic!("info sink broken");
        }
        fn warn(&self, _message: &str) {
            panic!("warn sink broken");
        }
        fn error(&self, _message: &str) {
            panic!("error sink broken");
        }
        fn fatal(&self, _failure: &Failure) {
            panic!("fatal sink broken");
        }
    }

    struct Offline;

    impl LogHandler for Offline {
        fn name(&self) -> &str {
            "offline"
        }
        fn is_available(&self) -> bool {
            false
        }
        fn info(&self, _message: &str) {}
        fn warn(&self, _message: &str) {}
        fn error(&self, _message: &str) {}
        fn fatal(&self, _failure: &Failure) {}
    }

    /// Registers another handler the first time it sees an info event
    struct Registrar {
        dispatcher: Arc<LogDispatcher>,
        late: SharedHandler,
    }

    impl LogHandler for Registrar {
        fn info(&self, _message: &str) {
            self.dispatcher.register(self.late.clone()).unwrap();
        }
        fn warn(&self, _message: &str) {}
        fn error(&self, _message: &str) {}
        fn fatal(&self, _failure: &Failure) {}
    }

    /// Forwards to another dispatcher without exposing it via `as_dispatcher`
    struct Forwarder {
        target: Arc<LogDispatcher>,
    }

    impl LogHandler for Forwarder {
        fn info(&self, message: &str) {
            self.target.info(message);
        }
        fn warn(&self, message: &str) {
            self.target.warn(message);
        }
        fn error(&self, message: &str) {
            self.target.error(message);
        }
        fn fatal(&self, failure: &Failure) {
            self.target.fatal(failure);
        }
    }

    /// Dispatches back into its own dispatcher and keeps the outcome
    struct Echo {
        dispatcher: Arc<LogDispatcher>,
        outcome: Mutex<Option<DispatchResult<DispatchReport>>>,
    }

    impl LogHandler for Echo {
        fn info(&self, message: &str) {
            let outcome = self.dispatcher.dispatch(&LogEvent::info(format!("echo {}", message)));
            *self.outcome.lock() = Some(outcome);
        }
        fn warn(&self, _message: &str) {}
        fn error(&self, _message: &str) {}
        fn fatal(&self, _failure: &Failure) {}
    }

    struct Nameless;

    impl LogHandler for Nameless {
        fn name(&self) -> &str {
            panic!("name broken");
        }
        fn info(&self, _message: &str) {}
        fn warn(&self, _message: &str) {}
        fn error(&self, _message: &str) {}
        fn fatal(&self, _failure: &Failure) {}
    }

    #[test]
    fn test_fan_out_reaches_every_handler_once() {
        for n in 0..5 {
            let dispatcher = LogDispatcher::new();
            let recorders: Vec<_> = (0..n).map(|i| recorder(&format!("r{}", i))).collect();
            for r in &recorders {
                dispatcher.register(r.clone()).unwrap();
            }

            let report = dispatcher.dispatch(&LogEvent::info("hello")).unwrap();
            assert_eq!(report, DispatchReport { delivered: n, contained: 0 });
            for r in &recorders {
                assert_eq!(r.events(), vec![LogEvent::info("hello")]);
            }
        }
    }

    #[test]
    fn test_panicking_handler_does_not_block_later_handlers() {
        let dispatcher = LogDispatcher::new();
        let after = recorder("after");
        dispatcher.register(Arc::new(Exploding)).unwrap();
        dispatcher.register(after.clone()).unwrap();

        for event in [
            LogEvent::info("a"),
            LogEvent::warn("b"),
            LogEvent::error("c"),
            LogEvent::fatal(Failure::new("X", 1, "d")),
        ] {
            let report = dispatcher.dispatch(&event).unwrap();
            assert_eq!(report, DispatchReport { delivered: 1, contained: 1 });
        }
        assert_eq!(after.len(), 4);

        // Same through the LogHandler impl
        dispatcher.info("e");
        assert_eq!(after.len(), 5);
    }

    #[test]
    fn test_deregistered_handler_gets_nothing() {
        let dispatcher = LogDispatcher::new();
        let kept = recorder("kept");
        let dropped = recorder("dropped");
        let dropped_shared: SharedHandler = dropped.clone();

        dispatcher.register(kept.clone()).unwrap();
        dispatcher.register(dropped_shared.clone()).unwrap();
        dispatcher.dispatch(&LogEvent::info("before")).unwrap();

        assert!(dispatcher.deregister(&dropped_shared).unwrap());
        assert!(!dispatcher.contains(&dropped_shared));
        for i in 0..10 {
            dispatcher.dispatch(&LogEvent::warn(format!("after {}", i))).unwrap();
        }

        assert_eq!(dropped.events(), vec![LogEvent::info("before")]);
        assert_eq!(kept.len(), 11);
    }

    #[test]
    fn test_deregister_absent_and_by_id() {
        let dispatcher = LogDispatcher::new();
        let stranger: SharedHandler = recorder("stranger");
        assert!(!dispatcher.deregister(&stranger).unwrap());

        let r = recorder("r");
        let id = dispatcher.register(r.clone()).unwrap();
        assert!(dispatcher.deregister_id(id).unwrap());
        assert!(!dispatcher.deregister_id(id).unwrap());
        assert!(dispatcher.is_empty());

        dispatcher.dispatch(&LogEvent::info("nobody")).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn test_severity_routing_is_exact() {
        let dispatcher = LogDispatcher::new();
        let r = recorder("r");
        dispatcher.register(r.clone()).unwrap();

        dispatcher.dispatch(&LogEvent::info("i")).unwrap();
        assert_eq!(r.count(Severity::Info), 1);
        assert_eq!(r.count(Severity::Warn) + r.count(Severity::Error) + r.count(Severity::Fatal), 0);

        r.clear();
        dispatcher.dispatch(&LogEvent::error("e")).unwrap();
        assert_eq!(r.events(), vec![LogEvent::error("e")]);

        r.clear();
        dispatcher.dispatch(&LogEvent::fatal(Failure::new("X", 1, "f"))).unwrap();
        assert_eq!(r.count(Severity::Fatal), 1);
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_fatal_payload_delivered_intact() {
        let dispatcher = LogDispatcher::new();
        let recorders: Vec<_> = (0..3).map(|i| recorder(&format!("r{}", i))).collect();
        for r in &recorders {
            dispatcher.register(r.clone()).unwrap();
        }

        let failure = Failure::new("X", 42, "boom")
            .with_detail("module", "camera")
            .with_underlying(Failure::new("io", "EIO", "read error"));
        dispatcher.dispatch(&LogEvent::fatal(failure.clone())).unwrap();

        for r in &recorders {
            let received = r.failures();
            assert_eq!(received, vec![failure.clone()]);
            assert_eq!(received[0].domain(), "X");
            assert_eq!(received[0].description(), "boom");
        }
    }

    #[test]
    fn test_duplicate_registration_is_deduplicated() {
        let dispatcher = LogDispatcher::new();
        let r = recorder("r");
        let shared: SharedHandler = r.clone();

        let first = dispatcher.register(shared.clone()).unwrap();
        let second = dispatcher.register(shared.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(dispatcher.len(), 1);

        dispatcher.dispatch(&LogEvent::info("once")).unwrap();
        assert_eq!(r.len(), 1);

        // Distinct instances of the same type are distinct handlers
        dispatcher.register(Arc::new(NoOpHandler)).unwrap();
        dispatcher.register(Arc::new(NoOpHandler)).unwrap();
        assert_eq!(dispatcher.len(), 3);
    }

    #[test]
    fn test_registration_order_is_delivery_order() {
        let dispatcher = LogDispatcher::new();
        dispatcher.register(recorder("first")).unwrap();
        dispatcher.register(Arc::new(NoOpHandler)).unwrap();
        dispatcher.register(recorder("third")).unwrap();

        assert_eq!(dispatcher.handler_names(), vec!["first", "noop", "third"]);
    }

    #[test]
    fn test_sequential_events_keep_order() {
        let dispatcher = LogDispatcher::new();
        let r = recorder("r");
        dispatcher.register(r.clone()).unwrap();

        let expected: Vec<_> = (0..50).map(|i| LogEvent::info(i.to_string())).collect();
        for event in &expected {
            dispatcher.dispatch(event).unwrap();
        }
        assert_eq!(r.events(), expected);
    }

    #[test]
    fn test_rejects_unavailable_and_self() {
        let dispatcher = Arc::new(LogDispatcher::new());
        assert_eq!(
            dispatcher.register(Arc::new(Offline)),
            Err(DispatchError::Unavailable("offline".to_string()))
        );

        let as_handler: SharedHandler = dispatcher.clone();
        assert_eq!(dispatcher.register(as_handler), Err(DispatchError::SelfRegistration));

        // Wrapping the dispatcher in another Arc does not hide it
        let wrapped: SharedHandler = Arc::new(dispatcher.clone());
        assert_eq!(dispatcher.register(wrapped), Err(DispatchError::SelfRegistration));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_rejects_dispatcher_cycles() {
        let a = Arc::new(LogDispatcher::new());
        let b = Arc::new(LogDispatcher::new());
        let c = Arc::new(LogDispatcher::new());

        b.register(a.clone()).unwrap();
        assert_eq!(a.register(b.clone()), Err(DispatchError::SelfRegistration));

        // Longer loop: a -> c -> b -> a
        c.register(b.clone()).unwrap();
        assert_eq!(a.register(c.clone()), Err(DispatchError::SelfRegistration));
        assert!(a.is_empty());

        // Diamonds are fine
        let leaf = Arc::new(LogDispatcher::new());
        let r = recorder("leaf");
        leaf.register(r.clone()).unwrap();
        a.register(leaf.clone()).unwrap();
        c.register(leaf.clone()).unwrap();
        c.dispatch(&LogEvent::info("twice")).unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_hidden_cycle_delivers_once() {
        let a = Arc::new(LogDispatcher::new());
        let b = Arc::new(LogDispatcher::new());
        let ra = recorder("a");
        let rb = recorder("b");

        a.register(ra.clone()).unwrap();
        a.register(Arc::new(Forwarder { target: b.clone() })).unwrap();
        b.register(rb.clone()).unwrap();
        b.register(Arc::new(Forwarder { target: a.clone() })).unwrap();

        let report = a.dispatch(&LogEvent::info("around")).unwrap();
        assert_eq!(report, DispatchReport { delivered: 2, contained: 0 });
        b.warn("and back");

        assert_eq!(ra.events(), vec![LogEvent::info("around"), LogEvent::warn("and back")]);
        assert_eq!(rb.events(), vec![LogEvent::info("around"), LogEvent::warn("and back")]);

        // Break the Arc cycle
        a.shutdown();
        b.shutdown();
    }

    #[test]
    fn test_dispatch_from_own_handler_is_reentrant() {
        let dispatcher = Arc::new(LogDispatcher::new());
        let r = recorder("r");
        let echo = Arc::new(Echo {
            dispatcher: dispatcher.clone(),
            outcome: Mutex::new(None),
        });
        dispatcher.register(echo.clone()).unwrap();
        dispatcher.register(r.clone()).unwrap();

        dispatcher.dispatch(&LogEvent::info("ping")).unwrap();
        assert_eq!(*echo.outcome.lock(), Some(Err(DispatchError::Reentrant)));
        assert_eq!(r.events(), vec![LogEvent::info("ping")]);

        // The guard is released once delivery finishes
        let report = dispatcher.dispatch(&LogEvent::warn("later")).unwrap();
        assert_eq!(report.delivered, 2);

        dispatcher.shutdown();
    }

    #[test]
    fn test_register_boxed() {
        let dispatcher = LogDispatcher::new();
        let boxed: BoxedHandler = Box::new(NoOpHandler);
        let id = dispatcher.register_boxed(boxed).unwrap();

        assert!(dispatcher.contains_id(id));
        assert_eq!(dispatcher.dispatch(&LogEvent::info("x")).unwrap().delivered, 1);
        assert!(dispatcher.deregister_id(id).unwrap());
        assert!(!dispatcher.contains_id(id));
    }

    #[test]
    fn test_panicking_name_is_not_called_when_diagnostics_off() {
        crate::diagnostics::set_enabled(false);
        let dispatcher = LogDispatcher::new();
        let handler: SharedHandler = Arc::new(Nameless);

        dispatcher.register(handler.clone()).unwrap();
        dispatcher.register(handler.clone()).unwrap();
        let report = dispatcher.dispatch(&LogEvent::error("quiet")).unwrap();
        assert_eq!(report, DispatchReport { delivered: 1, contained: 0 });
        assert!(dispatcher.deregister(&handler).unwrap());
    }

    #[test]
    fn test_shutdown() {
        let dispatcher = LogDispatcher::new();
        let r = recorder("r");
        let shared: SharedHandler = r.clone();
        dispatcher.register(shared.clone()).unwrap();
        dispatcher.register(Arc::new(NoOpHandler)).unwrap();

        assert_eq!(dispatcher.shutdown(), 2);
        assert!(dispatcher.is_shut_down());
        assert_eq!(dispatcher.shutdown(), 0);

        assert_eq!(dispatcher.dispatch(&LogEvent::info("late")), Err(DispatchError::ShutDown));
        assert_eq!(dispatcher.register(shared.clone()), Err(DispatchError::ShutDown));
        assert_eq!(dispatcher.deregister(&shared), Err(DispatchError::ShutDown));
        assert_eq!(dispatcher.clear(), Err(DispatchError::ShutDown));

        // Handler impl is a silent no-op
        dispatcher.error("late");
        assert!(r.is_empty());
        assert!(!dispatcher.is_available());
        assert_eq!(dispatcher.len(), 0);
    }

    #[test]
    fn test_clear() {
        let dispatcher = LogDispatcher::new();
        let r = recorder("r");
        dispatcher.register(r.clone()).unwrap();
        dispatcher.register(Arc::new(NoOpHandler)).unwrap();

        assert_eq!(dispatcher.clear().unwrap(), 2);
        dispatcher.dispatch(&LogEvent::info("gone")).unwrap();
        assert!(r.is_empty());
        assert!(!dispatcher.is_shut_down());
    }

    #[test]
    fn test_nested_dispatcher() {
        let outer = LogDispatcher::new();
        let inner = Arc::new(LogDispatcher::new());
        let r = recorder("leaf");
        inner.register(r.clone()).unwrap();
        outer.register(inner.clone()).unwrap();

        outer.dispatch(&LogEvent::fatal(Failure::new("X", 42, "boom"))).unwrap();
        assert_eq!(r.failures(), vec![Failure::new("X", 42, "boom")]);
    }

    #[test]
    fn test_register_from_inside_handler() {
        let dispatcher = Arc::new(LogDispatcher::new());
        let late = recorder("late");
        dispatcher
            .register(Arc::new(Registrar {
                dispatcher: dispatcher.clone(),
                late: late.clone(),
            }))
            .unwrap();

        // The in-flight dispatch uses the snapshot taken before the handler ran
        dispatcher.dispatch(&LogEvent::info("first")).unwrap();
        assert!(late.is_empty());
        assert_eq!(dispatcher.len(), 2);

        dispatcher.dispatch(&LogEvent::info("second")).unwrap();
        assert_eq!(late.events(), vec![LogEvent::info("second")]);

        // Break the Arc cycle
        dispatcher.shutdown();
    }

    #[test]
    fn test_concurrent_registration_and_dispatch() {
        const REGISTRARS: usize = 8;
        const DISPATCHERS: usize = 4;
        const EVENTS: usize = 200;

        let dispatcher = LogDispatcher::new();
        let recorders: Vec<_> = (0..REGISTRARS).map(|i| recorder(&format!("r{}", i))).collect();
        let shared_dup = recorder("dup");

        thread::scope(|s| {
            for r in &recorders {
                let dispatcher = &dispatcher;
                let shared_dup = shared_dup.clone();
                s.spawn(move || {
                    dispatcher.register(r.clone()).unwrap();
                    // Every registrar also races on the same instance
                    dispatcher.register(shared_dup).unwrap();
                });
            }
            for t in 0..DISPATCHERS {
                let dispatcher = &dispatcher;
                s.spawn(move || {
                    for i in 0..EVENTS {
                        let report = dispatcher
                            .dispatch(&LogEvent::info(format!("{}-{}", t, i)))
                            .unwrap();
                        assert_eq!(report.contained, 0);
                        assert!(report.delivered <= REGISTRARS + 1);
                    }
                });
            }
        });

        assert_eq!(dispatcher.len(), REGISTRARS + 1);
        for r in recorders.iter().chain(std::iter::once(&shared_dup)) {
            assert!(r.len() <= DISPATCHERS * EVENTS);
        }

        // Everything registered sees everything from now on
        dispatcher.dispatch(&LogEvent::warn("final")).unwrap();
        for r in recorders.iter().chain(std::iter::once(&shared_dup)) {
            assert_eq!(r.count(Severity::Warn), 1);
        }
    }
}
