use std::sync::atomic::{AtomicBool, Ordering};

use crate::events::{SubscriptionId, Subscribers, EVENT_CONNECTIVITY_CHANGED};

/// Offline flag reported by the host environment.
///
/// The controller only reads this flag; deciding when the app is offline is up to
/// whoever owns the monitor.
#[derive(Default)]
pub struct ConnectivityMonitor {
    is_offline: AtomicBool,
    subscribers: Subscribers<bool>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        let previous = self.is_offline.swap(offline, Ordering::SeqCst);
        if previous != offline {
            log::info!("{EVENT_CONNECTIVITY_CHANGED} offline={offline}");
            self.subscribers.notify(&offline);
        }
    }

    pub fn toggle_offline(&self) -> bool {
        let next = !self.is_offline();
        self.set_offline(next);
        next
    }

    pub fn subscribe(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
