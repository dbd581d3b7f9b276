use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::models::{GroceryItem, ItemsFile, Timestamp};

const SCHEMA_VERSION: u32 = 1;

/// Server-side item table shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<ItemTable>>,
}

impl AppState {
    pub fn new(items: Vec<GroceryItem>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ItemTable { items })),
        }
    }

    pub fn items(&self) -> Vec<GroceryItem> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.items.clone()
    }

    /// Runs `change` against a draft of the table and hands the draft to `save`.
    ///
    /// The draft replaces the live table only when both succeed, so a failed write leaves
    /// the table exactly as it was. The lock is held throughout, so saves land in
    /// mutation order.
    pub fn transact<T, E>(
        &self,
        change: impl FnOnce(&mut ItemTable) -> Result<T, E>,
        save: impl FnOnce(&ItemsFile) -> Result<(), E>,
    ) -> Result<T, E> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let mut draft = guard.clone();
        let value = change(&mut draft)?;
        let file = ItemsFile {
            schema_version: SCHEMA_VERSION,
            items: draft.items,
        };
        save(&file)?;
        guard.items = file.items;
        Ok(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemTable {
    items: Vec<GroceryItem>,
}

impl ItemTable {
    pub fn items(&self) -> &[GroceryItem] {
        &self.items
    }

    pub fn add_item(&mut self, item: GroceryItem) {
        self.items.push(item);
    }

    /// Replaces an item wholesale, keeping its creation time. Returns the stored item.
    pub fn update_item(&mut self, item: GroceryItem, now: Timestamp) -> Option<GroceryItem> {
        let existing = self.items.iter_mut().find(|i| i.id == item.id)?;
        let date_created = existing.date_created;
        *existing = GroceryItem {
            date_created,
            date_modified: now.max(date_created),
            ..item
        };
        Some(existing.clone())
    }

    pub fn set_checked(&mut self, id: Uuid, is_checked: bool, now: Timestamp) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.is_checked = is_checked;
                item.date_modified = now.max(item.date_created);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Removes every listed id that exists and returns how many were removed.
    pub fn remove_items(&mut self, ids: &[Uuid]) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id));
        before - self.items.len()
    }
}
