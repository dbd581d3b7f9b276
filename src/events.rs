use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::models::FilterPreferences;

pub const EVENT_PREFERENCES_CHANGED: &str = "preferences_changed";
pub const EVENT_CONNECTIVITY_CHANGED: &str = "connectivity_changed";

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PreferencesPayload {
    pub filters: FilterPreferences,
    pub is_shopping_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Listener registry owned by whatever object emits the event.
///
/// Components subscribe when they mount and must unsubscribe when they unmount.
pub struct Subscribers<T> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Subscribers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut guard = self.listeners.lock().expect("subscribers poisoned");
        guard.push((id, Box::new(listener)));
        id
    }

    /// Returns false when the id was never registered or is already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.listeners.lock().expect("subscribers poisoned");
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }

    pub fn notify(&self, event: &T) {
        let guard = self.listeners.lock().expect("subscribers poisoned");
        for (_, listener) in guard.iter() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().expect("subscribers poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
