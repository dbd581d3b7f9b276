use std::collections::BTreeSet;

use crate::events::{PreferencesPayload, SubscriptionId, Subscribers, EVENT_PREFERENCES_CHANGED};
use crate::models::{FilterPreferences, SortBy};
use crate::storage::Storage;

pub const KEY_USER_FILTERS: &str = "userFilters";
pub const KEY_SHOPPING_MODE: &str = "isShoppingMode";

/// Client-local sort/filter preference plus the shopping-mode flag.
///
/// Every mutation is written through to local storage immediately and then broadcast
/// to subscribers. Storage failures are logged and never fail the user action.
pub struct PreferenceStore {
    storage: Storage,
    filters: FilterPreferences,
    is_shopping_mode: bool,
    subscribers: Subscribers<PreferencesPayload>,
}

impl PreferenceStore {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            filters: FilterPreferences::default(),
            is_shopping_mode: false,
            subscribers: Subscribers::new(),
        }
    }

    /// Loads both keys; anything missing or unreadable falls back to defaults.
    pub fn initialize(&mut self) {
        self.is_shopping_mode = match self.storage.get_item::<bool>(KEY_SHOPPING_MODE) {
            Ok(value) => value.unwrap_or(false),
            Err(error) => {
                log::warn!("failed to load {KEY_SHOPPING_MODE}: {error}");
                false
            }
        };
        match self.storage.get_item::<FilterPreferences>(KEY_USER_FILTERS) {
            Ok(Some(filters)) => self.filters = filters,
            Ok(None) => {}
            Err(error) => log::warn!("failed to load {KEY_USER_FILTERS}: {error}"),
        }
        self.notify();
    }

    pub fn filters(&self) -> &FilterPreferences {
        &self.filters
    }

    /// Saved sort key, or the default when the stored string is not a known key.
    pub fn sort_by(&self) -> SortBy {
        self.filters.sort_by.parse().unwrap_or_else(|_| {
            log::warn!(
                "ignoring unknown saved sort key {:?}, using {}",
                self.filters.sort_by,
                SortBy::default()
            );
            SortBy::default()
        })
    }

    pub fn is_shopping_mode(&self) -> bool {
        self.is_shopping_mode
    }

    pub fn set_shopping_mode(&mut self, value: bool) {
        self.is_shopping_mode = value;
        self.save_and_notify();
    }

    /// True when the live selection differs from what was last saved. Filter order and
    /// duplicates do not count as a difference.
    pub fn diverges_from(
        &self,
        sort_by: SortBy,
        stores: &BTreeSet<String>,
        departments: &BTreeSet<String>,
    ) -> bool {
        self.filters.sort_by != sort_by.as_str()
            || self.filters.store_set() != *stores
            || self.filters.department_set() != *departments
    }

    pub fn update_filters(
        &mut self,
        sort_by: SortBy,
        stores: &BTreeSet<String>,
        departments: &BTreeSet<String>,
    ) {
        log::debug!(
            "update filters sort={sort_by} stores={stores:?} departments={departments:?}"
        );
        self.filters = FilterPreferences {
            sort_by: sort_by.as_str().to_string(),
            filter_stores: stores.iter().cloned().collect(),
            filter_departments: departments.iter().cloned().collect(),
        };
        self.save_and_notify();
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&PreferencesPayload) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn save_and_notify(&self) {
        if let Err(error) = self.storage.set_item(KEY_SHOPPING_MODE, &self.is_shopping_mode) {
            log::warn!("failed to save {KEY_SHOPPING_MODE}: {error}");
        }
        if let Err(error) = self.storage.set_item(KEY_USER_FILTERS, &self.filters) {
            log::warn!("failed to save {KEY_USER_FILTERS}: {error}");
        }
        self.notify();
    }

    fn notify(&self) {
        log::debug!("emit {EVENT_PREFERENCES_CHANGED}");
        self.subscribers.notify(&PreferencesPayload {
            filters: self.filters.clone(),
            is_shopping_mode: self.is_shopping_mode,
        });
    }
}
