//! Shell events.
//!
//! Listeners are plain callbacks invoked synchronously, in registration
//! order, on the thread that emits the event. Subscribing hands back a
//! [`ListenerId`] that removes the listener again.

use crate::error::AppError;
use crate::{debug_log, RouteSnapshot};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Something the view layer may want to react to.
#[derive(Debug, Clone)]
pub enum ShellEvent {
    /// A navigation settled (successfully, with an error, or by redirect).
    RouteChanged {
        /// Incoming route.
        to: Arc<RouteSnapshot>,
        /// Outgoing route.
        from: Arc<RouteSnapshot>,
        /// Error raised by the navigation, if any.
        error: Option<AppError>,
    },
    /// The application finished mounting.
    Ready,
    /// A reused page was re-initialised; scroll behaviour may run.
    TriggerScroll,
    /// A deployed asset is gone; the host should hard-reload the page.
    ReloadRequested {
        /// Path to reload.
        path: String,
    },
}

/// Event listener.
pub type EventListener = Arc<dyn Fn(&ShellEvent) + Send + Sync>;

/// Identifies a subscription on an [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered list of listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<(ListenerId, EventListener)>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener.
    ///
    /// Listeners added or removed while the event is delivered take effect
    /// from the next event on.
    pub fn emit(&self, event: &ShellEvent) {
        let listeners: Vec<EventListener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        debug_log!("Emitting {:?} to {} listener(s)", EventKind(event), listeners.len());
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// `true` without listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

struct EventKind<'a>(&'a ShellEvent);

impl fmt::Debug for EventKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            ShellEvent::RouteChanged { .. } => "RouteChanged",
            ShellEvent::Ready => "Ready",
            ShellEvent::TriggerScroll => "TriggerScroll",
            ShellEvent::ReloadRequested { .. } => "ReloadRequested",
        })
    }
}
