//! Fire-and-forget notifications.
//!
//! Guards report noteworthy outcomes (`session.authenticated`,
//! `session.rejected`, ...) to an [`EventSink`]. What happens next is the
//! sink's business: log it, forward it to a broker, or drop it.
//!
//! [`Listeners`] is the composable sink: register handlers per event name or
//! for every event, then hand it to whatever needs a sink.
//!
//! # Example
//!
//! ```
//! use restguard_core::events::{EventSink, Listeners};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//!
//! let listeners = Listeners::new().on_event("session.rejected", move |_, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! listeners.notify("session.rejected", serde_json::json!({ "status": 403 }));
//! listeners.notify("session.authenticated", serde_json::json!({}));
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use serde_json::Value as Json;
use std::fmt;
use std::sync::Arc;

/// Receiver of named events.
///
/// `notify` must not block; sinks that do I/O should queue and return.
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    fn notify(&self, event: &str, payload: Json);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn notify(&self, event: &str, payload: Json) {
        (**self).notify(event, payload);
    }
}

type Handler = Arc<dyn Fn(&str, &Json) + Send + Sync>;

/// Handler registry implementing [`EventSink`].
#[derive(Clone, Default)]
pub struct Listeners {
    named: Vec<(String, Handler)>,
    any: Vec<Handler>,
}

impl Listeners {
    /// No handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event named `event`.
    #[must_use]
    pub fn on_event(mut self, event: impl Into<String>, handler: impl Fn(&str, &Json) + Send + Sync + 'static) -> Self {
        self.named.push((event.into(), Arc::new(handler)));
        self
    }

    /// Call `handler` for every event.
    #[must_use]
    pub fn on_any(mut self, handler: impl Fn(&str, &Json) + Send + Sync + 'static) -> Self {
        self.any.push(Arc::new(handler));
        self
    }

    /// Whether any handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.any.is_empty()
    }
}

impl EventSink for Listeners {
    fn notify(&self, event: &str, payload: Json) {
        for (name, handler) in &self.named {
            if name == event {
                handler(event, &payload);
            }
        }
        for handler in &self.any {
            handler(event, &payload);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("named", &self.named.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>())
            .field("any", &self.any.len())
            .finish()
    }
}

/// Logs every event at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn notify(&self, event: &str, payload: Json) {
        tracing::info!(event, %payload, "event");
    }
}
