//! Push-event subscriptions.
//!
//! Listeners are grouped by event name in a `DashMap`. Dispatch clones the
//! listener list for the name and releases the shard guard before invoking
//! anything, so listeners may subscribe or unsubscribe from inside a callback.
//! A listener that returns an error or panics is logged and skipped; the
//! remaining listeners still run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use workerlink_core::EventPayload;

use crate::telemetry;

/// Callback invoked for every occurrence of a subscribed event.
///
/// Implemented for any `Fn(&EventPayload) -> anyhow::Result<()>` closure.
pub trait EventListener: Send + Sync {
    /// Handles one event occurrence.
    ///
    /// # Errors
    ///
    /// Errors are logged by the dispatcher and never propagate further.
    fn on_event(&self, event: &str, payload: &EventPayload) -> anyhow::Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(&EventPayload) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, _event: &str, payload: &EventPayload) -> anyhow::Result<()> {
        self(payload)
    }
}

/// Wraps a closure as a shareable listener.
///
/// The returned `Arc` is the listener's identity: pass the same `Arc` to
/// `unsubscribe` to remove it.
pub fn listener<F>(f: F) -> Arc<dyn EventListener>
where
    F: Fn(&EventPayload) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Event name -> listeners, in registration order.
pub struct EventRegistry {
    bridge: String,
    listeners: DashMap<String, Vec<Arc<dyn EventListener>>>,
}

impl EventRegistry {
    /// Creates an empty registry labelled with the owning bridge's name.
    #[must_use]
    pub fn new(bridge: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            listeners: DashMap::new(),
        }
    }

    /// Adds `listener` for `event`. Adding a listener already present for
    /// that event is a no-op.
    pub fn add(&self, event: &str, listener: Arc<dyn EventListener>) {
        let mut entry = self.listeners.entry(event.to_string()).or_default();
        if !entry.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
            entry.push(listener);
        }
    }

    /// Removes `listener` from `event`. Returns `false` if it was not registered.
    pub fn remove(&self, event: &str, listener: &Arc<dyn EventListener>) -> bool {
        let (removed, now_empty) = match self.listeners.get_mut(event) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|existing| !Arc::ptr_eq(existing, listener));
                (entry.len() != before, entry.is_empty())
            }
            None => return false,
        };
        if now_empty {
            self.listeners.remove_if(event, |_, list| list.is_empty());
        }
        removed
    }

    /// Removes every listener for `event`, or for all events when `None`.
    pub fn clear(&self, event: Option<&str>) {
        match event {
            Some(name) => {
                self.listeners.remove(name);
            }
            None => self.listeners.clear(),
        }
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entry| entry.len())
    }

    /// Invokes every listener registered for `event`, in registration order.
    ///
    /// Returns the number of listeners that completed without error.
    pub fn dispatch(&self, event: &str, payload: &EventPayload) -> usize {
        let Some(snapshot) = self.listeners.get(event).map(|entry| entry.value().clone()) else {
            tracing::trace!(bridge = %self.bridge, event, "event has no listeners");
            return 0;
        };

        telemetry::event_dispatched(&self.bridge);

        let mut delivered = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event, payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::warn!(bridge = %self.bridge, event, error = %err, "event listener failed");
                }
                Err(_) => {
                    tracing::warn!(bridge = %self.bridge, event, "event listener panicked");
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("bridge", &self.bridge)
            .field("events", &self.listeners.len())
            .finish()
    }
}

/// Handle returned by `subscribe`; removes exactly the listener it was created for.
///
/// Dropping the handle does not unsubscribe.
#[derive(Clone)]
pub struct Subscription {
    registry: Arc<EventRegistry>,
    event: String,
    listener: Arc<dyn EventListener>,
}

impl Subscription {
    pub(crate) fn new(
        registry: Arc<EventRegistry>,
        event: String,
        listener: Arc<dyn EventListener>,
    ) -> Self {
        Self {
            registry,
            event,
            listener,
        }
    }

    /// The event name this subscription listens to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the listener. Equivalent to `unsubscribe(event, listener)`.
    pub fn unsubscribe(&self) {
        self.registry.remove(&self.event, &self.listener);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
