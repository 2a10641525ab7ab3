//! Update listeners for data coordinators
//!
//! A coordinator polls a device and tells its subscribers every time new
//! data is in. Subscribing returns a [`RemoveListener`] handle; the
//! subscription lasts until that handle is used, typically from a config
//! entry's unload callbacks.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Callback invoked after every coordinator refresh
pub type UpdateListener = Arc<dyn Fn() + Send + Sync>;

/// A unique identifier for an update listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// The set of listeners subscribed to one coordinator
pub struct UpdateListeners {
    listeners: DashMap<ListenerId, UpdateListener>,
    next_listener_id: AtomicU64,
}

impl UpdateListeners {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a listener; it stays registered until the handle is used
    pub fn add_listener(
        self: &Arc<Self>,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> RemoveListener {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.insert(id, Arc::new(listener));
        trace!(listener_id = id.0, "Added update listener");
        RemoveListener {
            listeners: Arc::downgrade(self),
            id,
        }
    }

    fn remove(&self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        trace!(listener_id = id.0, removed, "Removed update listener");
        removed
    }

    /// Call every listener in subscription order; returns how many ran
    ///
    /// Listeners may subscribe or unsubscribe while being notified: the set
    /// is snapshotted before any listener runs.
    pub fn async_update_listeners(&self) -> usize {
        let mut snapshot: Vec<(ListenerId, UpdateListener)> = self
            .listeners
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        debug!(count = snapshot.len(), "Notifying update listeners");
        for (_, listener) in &snapshot {
            listener();
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for UpdateListeners {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle that unsubscribes a listener when [`RemoveListener::remove`] is called
#[must_use = "dropping the handle leaves the listener subscribed forever"]
#[derive(Debug)]
pub struct RemoveListener {
    listeners: Weak<UpdateListeners>,
    id: ListenerId,
}

impl RemoveListener {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe; returns false if the listener or its coordinator is already gone
    pub fn remove(self) -> bool {
        self.listeners
            .upgrade()
            .map(|listeners| listeners.remove(self.id))
            .unwrap_or(false)
    }
}
