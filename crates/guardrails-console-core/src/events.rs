//! In-process change notifications.
//!
//! One channel, "audit log changed". Publishing calls every handler
//! registered at that moment, synchronously and with no payload. Nothing is
//! buffered: a handler registered after a publish never sees it.
//! Subscribers must not rely on delivery order.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Name of the single channel carried by [`EventBus`].
pub const AUDIT_LOG_CHANGED: &str = "audit-log-changed";

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

/// Broadcast channel telling views the audit log was appended to or purged.
///
/// Cheap to clone; clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every current subscriber.
    pub fn publish(&self) {
        // Snapshot so handlers may subscribe or unsubscribe re-entrantly.
        let handlers: Vec<Handler> = self.registry.handlers.lock().values().cloned().collect();
        tracing::debug!(
            channel = AUDIT_LOG_CHANGED,
            subscribers = handlers.len(),
            "publishing change notification"
        );
        for handler in handlers {
            handler();
        }
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.handlers.lock().insert(id, Arc::new(handler));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handlers.lock().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("channel", &AUDIT_LOG_CHANGED)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Unsubscribe capability returned by [`EventBus::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.handlers.lock().remove(&self.id);
        }
    }
}
