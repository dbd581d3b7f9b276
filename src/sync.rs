//! Mediates between user actions and the remote API.
//!
//! Only check/uncheck is optimistic: the flag flips locally and the view is re-derived
//! before the request goes out, and a failed request reverts it. Every other mutation
//! waits for the server and then refetches, except bulk delete, which prunes the cache
//! directly on success.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::api::GroceryApi;
use crate::connectivity::ConnectivityMonitor;
use crate::dialog::{ConfirmRequest, DialogService};
use crate::error::GroceryError;
use crate::events::SubscriptionId;
use crate::models::{GroceryItem, GroceryList, QUICK_ADD_ITEMS};
use crate::preferences::PreferenceStore;
use crate::view::{DepartmentGroup, ViewEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fresh,
    /// The fetch failed while offline; the view is driven by the last known cache.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDeleteOutcome {
    NothingChecked,
    Cancelled,
    Deleted(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Cancelled,
    Unchanged,
    Updated,
}

/// Splits free text like `"milk, eggs & bread and jam"` into item names.
pub fn split_item_names(input: &str) -> Vec<String> {
    input
        .split([',', '&'])
        .flat_map(|part| {
            let words: Vec<&str> = part.split_whitespace().collect();
            words
                .split(|word| word.eq_ignore_ascii_case("and"))
                .map(|chunk| chunk.join(" "))
                .collect::<Vec<_>>()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

fn distinct_names(items: &[GroceryItem]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.name.as_str()))
        .map(|item| item.name.clone())
        .collect()
}

pub struct SyncController<A> {
    api: A,
    connectivity: Arc<ConnectivityMonitor>,
    preferences: PreferenceStore,
    view: ViewEngine,
    list: GroceryList,
    known_item_names: Vec<String>,
    action_state: ActionState,
    initialized: bool,
    render_requested: Arc<AtomicBool>,
    subscriptions: Option<(SubscriptionId, SubscriptionId)>,
}

impl<A: GroceryApi> SyncController<A> {
    pub fn new(api: A, connectivity: Arc<ConnectivityMonitor>, preferences: PreferenceStore) -> Self {
        Self {
            api,
            connectivity,
            preferences,
            view: ViewEngine::default(),
            list: GroceryList::default(),
            known_item_names: Vec::new(),
            action_state: ActionState::Idle,
            initialized: false,
            render_requested: Arc::new(AtomicBool::new(false)),
            subscriptions: None,
        }
    }

    /// Loads saved preferences, subscribes to change notifications and performs the
    /// first fetch.
    pub async fn initialize(&mut self) -> Result<FetchOutcome, GroceryError> {
        self.preferences.initialize();
        let auto_collapse = self.view.options().auto_collapse;
        self.view = ViewEngine::from_preferences(&self.preferences);
        self.view.set_auto_collapse(auto_collapse);

        if self.subscriptions.is_none() {
            let flag = self.render_requested.clone();
            let preferences_id = self
                .preferences
                .subscribe(move |_| flag.store(true, Ordering::SeqCst));
            let flag = self.render_requested.clone();
            let connectivity_id = self
                .connectivity
                .subscribe(move |_| flag.store(true, Ordering::SeqCst));
            self.subscriptions = Some((preferences_id, connectivity_id));
        }

        let outcome = self.fetch_data().await?;
        self.initialized = true;
        Ok(outcome)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn list(&self) -> &GroceryList {
        &self.list
    }

    pub fn items(&self) -> &[GroceryItem] {
        &self.list.grocery_items
    }

    pub fn visible(&self) -> &[GroceryItem] {
        self.view.visible()
    }

    pub fn view(&self) -> &ViewEngine {
        &self.view
    }

    pub fn groups(&self) -> Vec<DepartmentGroup<'_>> {
        self.view.groups()
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn known_item_names(&self) -> &[String] {
        &self.known_item_names
    }

    pub fn action_state(&self) -> ActionState {
        self.action_state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_offline(&self) -> bool {
        self.connectivity.is_offline()
    }

    /// Returns true once per burst of preference or connectivity notifications.
    pub fn take_render_request(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    /// All known names for an empty query, otherwise case-insensitive substring matches.
    pub fn search_known_items(&self, query: &str) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.known_item_names
            .iter()
            .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    pub async fn fetch_data(&mut self) -> Result<FetchOutcome, GroceryError> {
        match self.api.get_list().await {
            Ok(list) => {
                self.known_item_names = distinct_names(&list.grocery_items);
                self.list = list;
                self.refresh();
                Ok(FetchOutcome::Fresh)
            }
            Err(error) if self.connectivity.is_offline() => {
                log::warn!("fetch failed while offline, showing cached list: {error}");
                self.refresh();
                Ok(FetchOutcome::Stale)
            }
            Err(error) => Err(error),
        }
    }

    pub fn set_sort_key(&mut self, value: &str) -> Result<(), GroceryError> {
        self.view.set_sort_key(value)?;
        self.refresh();
        Ok(())
    }

    pub fn set_store_filter<I, S>(&mut self, stores: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view.set_store_filter(stores);
        self.refresh();
    }

    pub fn set_department_filter<I, S>(&mut self, departments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.view.set_department_filter(departments);
        self.refresh();
    }

    pub fn toggle_store_filter_mode(&mut self) -> bool {
        let toggled = self.view.toggle_store_filter_mode();
        if toggled {
            self.refresh();
        }
        toggled
    }

    /// With auto-collapse off, departments keep their expansion as items get checked.
    pub fn set_auto_collapse(&mut self, enabled: bool) {
        self.view.set_auto_collapse(enabled);
        self.refresh();
    }

    pub fn set_group_expanded(&mut self, department: &str, expanded: bool) {
        self.view.set_group_expanded(department, expanded);
    }

    pub fn set_shopping_mode(&mut self, value: bool) {
        self.preferences.set_shopping_mode(value);
    }

    pub async fn add_item(&mut self, name: &str) -> Result<GroceryItem, GroceryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroceryError::InvalidArgument("item name is empty".to_string()));
        }
        self.action_state = ActionState::Pending;
        let result = self.add_item_inner(name).await;
        self.settle(result)
    }

    async fn add_item_inner(&mut self, name: &str) -> Result<GroceryItem, GroceryError> {
        let candidate = GroceryItem::candidate(name, Utc::now());
        let created = self.api.add_item(&candidate).await?;
        log::info!("added grocery item id={} name={:?}", created.id, created.name);
        self.fetch_data().await?;
        Ok(created)
    }

    /// Adds every name in a comma / `&` / `and` separated list, stopping at the first failure.
    pub async fn add_items(&mut self, input: &str) -> Result<Vec<GroceryItem>, GroceryError> {
        let names = split_item_names(input);
        if names.is_empty() {
            return Err(GroceryError::InvalidArgument("no item names given".to_string()));
        }
        let mut created = Vec::with_capacity(names.len());
        for name in names {
            created.push(self.add_item(&name).await?);
        }
        Ok(created)
    }

    pub async fn quick_add(&mut self, name: &str) -> Result<GroceryItem, GroceryError> {
        if !QUICK_ADD_ITEMS.contains(&name) {
            return Err(GroceryError::InvalidArgument(format!("not a quick-add item: {name}")));
        }
        self.add_item(name).await
    }

    /// Sends the full replacement item, then refetches.
    pub async fn update_item(&mut self, item: GroceryItem) -> Result<(), GroceryError> {
        let mut item = item;
        item.normalize();
        if item.name.is_empty() {
            return Err(GroceryError::InvalidArgument("item name is empty".to_string()));
        }
        self.action_state = ActionState::Pending;
        let result = self.update_item_inner(&item).await;
        self.settle(result)
    }

    async fn update_item_inner(&mut self, item: &GroceryItem) -> Result<(), GroceryError> {
        self.api.update_item(item).await?;
        self.fetch_data().await?;
        Ok(())
    }

    /// Flips the checked flag optimistically and returns the new value.
    ///
    /// A failed request reverts the flag and re-derives the view before the error is
    /// returned. If the request succeeds but the follow-up refetch fails, the change
    /// stays committed and the refetch error is returned.
    pub async fn toggle_checked(&mut self, id: Uuid) -> Result<bool, GroceryError> {
        let Some(is_checked) = self.apply_checked_flip(id) else {
            return Err(GroceryError::NotFound(id));
        };
        self.action_state = ActionState::Pending;

        match self.api.set_checked(id, is_checked).await {
            Ok(()) => {
                self.action_state = ActionState::Committed;
                self.fetch_data().await?;
                Ok(is_checked)
            }
            Err(error) => {
                log::warn!("set checked failed for {id}, rolling back: {error}");
                self.apply_checked_flip(id);
                self.action_state = ActionState::RolledBack;
                Err(error)
            }
        }
    }

    /// Flips the cached flag and re-derives the view. Returns the new flag.
    fn apply_checked_flip(&mut self, id: Uuid) -> Option<bool> {
        let item = self.list.grocery_items.iter_mut().find(|item| item.id == id)?;
        item.is_checked = !item.is_checked;
        let is_checked = item.is_checked;
        let department = item.department.clone();
        self.refresh();
        self.view.collapse_completed_department(&department, is_checked);
        Some(is_checked)
    }

    pub async fn delete_item(&mut self, id: Uuid) -> Result<(), GroceryError> {
        self.action_state = ActionState::Pending;
        let result = self.delete_item_inner(id).await;
        self.settle(result)
    }

    async fn delete_item_inner(&mut self, id: Uuid) -> Result<(), GroceryError> {
        self.api.delete_item(id).await?;
        log::info!("deleted grocery item id={id}");
        self.fetch_data().await?;
        Ok(())
    }

    /// Deletes every checked item in the current filtered view after confirmation.
    pub async fn delete_checked_items(
        &mut self,
        dialog: &impl DialogService,
    ) -> Result<BulkDeleteOutcome, GroceryError> {
        let ids: Vec<Uuid> = self
            .view
            .visible()
            .iter()
            .filter(|item| item.is_checked)
            .map(|item| item.id)
            .collect();
        if ids.is_empty() {
            return Ok(BulkDeleteOutcome::NothingChecked);
        }
        if !dialog.confirm(&ConfirmRequest::delete_checked()).await {
            return Ok(BulkDeleteOutcome::Cancelled);
        }

        self.action_state = ActionState::Pending;
        if let Err(error) = self.api.delete_items(&ids).await {
            log::warn!("bulk delete of {} items failed: {error}", ids.len());
            self.action_state = ActionState::RolledBack;
            return Err(error);
        }
        self.list
            .grocery_items
            .retain(|item| !ids.contains(&item.id));
        self.refresh();
        self.action_state = ActionState::Committed;
        log::info!("bulk deleted {} checked items", ids.len());
        Ok(BulkDeleteOutcome::Deleted(ids.len()))
    }

    /// Opens the details editor for an item and saves the result if it changed.
    pub async fn open_item_details(
        &mut self,
        id: Uuid,
        dialog: &impl DialogService,
    ) -> Result<EditOutcome, GroceryError> {
        let Some(original) = self.items().iter().find(|item| item.id == id).cloned() else {
            return Err(GroceryError::NotFound(id));
        };
        let Some(mut edited) = dialog.edit_item(&original, &self.known_item_names).await else {
            return Ok(EditOutcome::Cancelled);
        };
        edited.id = original.id;
        if edited == original {
            return Ok(EditOutcome::Unchanged);
        }
        self.update_item(edited).await?;
        Ok(EditOutcome::Updated)
    }

    fn refresh(&mut self) {
        self.view
            .apply(&self.list.grocery_items, &mut self.preferences);
    }

    fn settle<T>(&mut self, result: Result<T, GroceryError>) -> Result<T, GroceryError> {
        self.action_state = match &result {
            Ok(_) => ActionState::Committed,
            Err(_) => ActionState::RolledBack,
        };
        result
    }
}

impl<A> SyncController<A> {
    /// Drops the change subscriptions taken by `initialize`.
    pub fn dispose(&mut self) {
        if let Some((preferences_id, connectivity_id)) = self.subscriptions.take() {
            self.preferences.unsubscribe(preferences_id);
            self.connectivity.unsubscribe(connectivity_id);
        }
    }
}

impl<A> Drop for SyncController<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortBy;
    use crate::storage::Storage;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicI64;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        items: Mutex<Vec<GroceryItem>>,
        calls: Mutex<Vec<String>>,
        failing: Mutex<Vec<&'static str>>,
        clock: AtomicI64,
    }

    impl FakeApi {
        fn with_items(items: Vec<GroceryItem>) -> Self {
            let api = Self::default();
            api.clock.store(1_000, Ordering::SeqCst);
            *api.items.lock().unwrap() = items;
            api
        }

        fn fail_on(&self, op: &'static str) {
            self.failing.lock().unwrap().push(op);
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, op: &'static str) -> Result<(), GroceryError> {
            self.calls.lock().unwrap().push(op.to_string());
            if self.failing.lock().unwrap().contains(&op) {
                return Err(GroceryError::NetworkFailure(format!("{op} unreachable")));
            }
            Ok(())
        }

        fn tick(&self) -> chrono::DateTime<Utc> {
            let secs = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
            Utc.timestamp_opt(secs, 0).unwrap()
        }
    }

    impl GroceryApi for FakeApi {
        async fn get_list(&self) -> Result<GroceryList, GroceryError> {
            self.record("get_list")?;
            Ok(GroceryList {
                id: Uuid::new_v4(),
                name: "Groceries".into(),
                description: String::new(),
                grocery_items: self.items.lock().unwrap().clone(),
            })
        }

        async fn add_item(&self, item: &GroceryItem) -> Result<GroceryItem, GroceryError> {
            self.record("add_item")?;
            let now = self.tick();
            let mut created = item.clone();
            created.id = Uuid::new_v4();
            created.date_created = now;
            created.date_modified = now;
            self.items.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update_item(&self, item: &GroceryItem) -> Result<(), GroceryError> {
            self.record("update_item")?;
            let now = self.tick();
            let mut items = self.items.lock().unwrap();
            let existing = items
                .iter_mut()
                .find(|i| i.id == item.id)
                .ok_or(GroceryError::NotFound(item.id))?;
            *existing = GroceryItem {
                date_created: existing.date_created,
                date_modified: now,
                ..item.clone()
            };
            Ok(())
        }

        async fn set_checked(&self, id: Uuid, is_checked: bool) -> Result<(), GroceryError> {
            self.record("set_checked")?;
            let now = self.tick();
            let mut items = self.items.lock().unwrap();
            let existing = items
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or(GroceryError::NotFound(id))?;
            existing.is_checked = is_checked;
            existing.date_modified = now;
            Ok(())
        }

        async fn delete_item(&self, id: Uuid) -> Result<(), GroceryError> {
            self.record("delete_item")?;
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|i| i.id != id);
            if items.len() == before {
                return Err(GroceryError::NotFound(id));
            }
            Ok(())
        }

        async fn delete_items(&self, ids: &[Uuid]) -> Result<(), GroceryError> {
            self.record("delete_items")?;
            self.items.lock().unwrap().retain(|i| !ids.contains(&i.id));
            Ok(())
        }
    }

    struct ScriptedDialog {
        confirm: bool,
        edit: Option<GroceryItem>,
    }

    impl ScriptedDialog {
        fn confirming(confirm: bool) -> Self {
            Self { confirm, edit: None }
        }

        fn editing(edit: Option<GroceryItem>) -> Self {
            Self {
                confirm: false,
                edit,
            }
        }
    }

    impl DialogService for ScriptedDialog {
        async fn confirm(&self, request: &ConfirmRequest) -> bool {
            assert_eq!(request.yes_text, "Delete");
            self.confirm
        }

        async fn edit_item(&self, _item: &GroceryItem, _known: &[String]) -> Option<GroceryItem> {
            self.edit.clone()
        }
    }

    fn make_item(name: &str, department: &str, checked: bool, modified: i64) -> GroceryItem {
        GroceryItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            date_created: Utc.timestamp_opt(1, 0).unwrap(),
            date_modified: Utc.timestamp_opt(modified, 0).unwrap(),
            is_checked: checked,
            store: String::new(),
            brand: String::new(),
            department: department.to_string(),
            quantity: 1,
            quantity_type: String::new(),
            high_priority: None,
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        connectivity: Arc<ConnectivityMonitor>,
        controller: SyncController<FakeApi>,
    }

    fn harness(items: Vec<GroceryItem>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let preferences = PreferenceStore::new(Storage::new(dir.path().to_path_buf()));
        let connectivity = Arc::new(ConnectivityMonitor::new());
        let controller =
            SyncController::new(FakeApi::with_items(items), connectivity.clone(), preferences);
        Harness {
            _dir: dir,
            connectivity,
            controller,
        }
    }

    fn visible_names<A: GroceryApi>(controller: &SyncController<A>) -> Vec<String> {
        controller.visible().iter().map(|i| i.name.clone()).collect()
    }

    #[tokio::test]
    async fn initialize_fetches_and_derives_view() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let bread = make_item("Bread", "Bakery", false, 20);
        let mut h = harness(vec![milk, bread]);

        let outcome = h.controller.initialize().await.unwrap();
        assert_eq!(outcome, FetchOutcome::Fresh);
        assert!(h.controller.is_initialized());
        assert_eq!(visible_names(&h.controller), vec!["Bread", "Milk"]);
        assert_eq!(h.controller.known_item_names(), ["Milk", "Bread"]);
    }

    #[tokio::test]
    async fn add_trims_refetches_and_rejects_empty_names() {
        let mut h = harness(Vec::new());
        h.controller.initialize().await.unwrap();

        let created = h.controller.add_item("  Eggs ").await.unwrap();
        assert_eq!(created.name, "Eggs");
        assert!(!created.id.is_nil());
        assert!(!created.is_checked);
        assert_eq!(visible_names(&h.controller), vec!["Eggs"]);
        assert_eq!(h.controller.action_state(), ActionState::Committed);
        assert_eq!(
            h.controller.api().calls(),
            vec!["get_list", "add_item", "get_list"]
        );

        let err = h.controller.add_item("   ").await.expect_err("empty name");
        assert!(matches!(err, GroceryError::InvalidArgument(_)));
        assert_eq!(h.controller.api().calls().len(), 3);
    }

    #[tokio::test]
    async fn add_failure_keeps_no_local_insert() {
        let mut h = harness(Vec::new());
        h.controller.initialize().await.unwrap();
        h.controller.api().fail_on("add_item");

        let err = h.controller.add_item("Eggs").await.expect_err("add fails");
        assert!(err.is_network());
        assert!(h.controller.items().is_empty());
        assert_eq!(h.controller.action_state(), ActionState::RolledBack);
    }

    #[tokio::test]
    async fn toggle_commits_and_reconciles_with_server() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let bread = make_item("Bread", "Bakery", false, 20);
        let bread_id = bread.id;
        let mut h = harness(vec![milk, bread]);
        h.controller.initialize().await.unwrap();

        assert!(h.controller.toggle_checked(bread_id).await.unwrap());
        assert_eq!(h.controller.action_state(), ActionState::Committed);
        assert_eq!(visible_names(&h.controller), vec!["Milk", "Bread"]);
        let server_bread = h
            .controller
            .items()
            .iter()
            .find(|i| i.id == bread_id)
            .unwrap();
        assert!(server_bread.is_checked);
        assert!(server_bread.date_modified > Utc.timestamp_opt(20, 0).unwrap());
    }

    #[tokio::test]
    async fn toggle_failure_rolls_back_flag_and_view() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let bread = make_item("Bread", "Bakery", false, 20);
        let bread_id = bread.id;
        let mut h = harness(vec![milk, bread]);
        h.controller.initialize().await.unwrap();
        let before = h.controller.visible().to_vec();
        h.controller.api().fail_on("set_checked");

        let err = h.controller.toggle_checked(bread_id).await.expect_err("rollback");
        assert!(err.is_network());
        assert_eq!(h.controller.action_state(), ActionState::RolledBack);
        assert_eq!(h.controller.visible(), before.as_slice());
        assert!(h.controller.items().iter().all(|i| !i.is_checked));
        assert_eq!(
            h.controller.api().calls(),
            vec!["get_list", "set_checked"]
        );
    }

    #[tokio::test]
    async fn toggle_unknown_item_makes_no_request() {
        let mut h = harness(Vec::new());
        h.controller.initialize().await.unwrap();
        let missing = Uuid::new_v4();
        let err = h.controller.toggle_checked(missing).await.expect_err("unknown");
        assert!(matches!(err, GroceryError::NotFound(id) if id == missing));
        assert_eq!(h.controller.api().calls(), vec!["get_list"]);
    }

    #[tokio::test]
    async fn checking_last_item_collapses_department_and_unchecking_reexpands() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let cheese = make_item("Cheese", "Dairy", true, 5);
        let bread = make_item("Bread", "Bakery", false, 20);
        let milk_id = milk.id;
        let cheese_id = cheese.id;
        let mut h = harness(vec![milk, cheese, bread]);
        h.controller.initialize().await.unwrap();
        h.controller.set_sort_key("Department").unwrap();
        assert!(h.controller.view().is_expanded("Dairy"));

        h.controller.toggle_checked(milk_id).await.unwrap();
        assert!(!h.controller.view().is_expanded("Dairy"));
        assert!(h.controller.view().is_expanded("Bakery"));

        h.controller.toggle_checked(cheese_id).await.unwrap();
        assert!(h.controller.view().is_expanded("Dairy"));
    }

    #[tokio::test]
    async fn disabled_auto_collapse_keeps_completed_department_open() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let cheese = make_item("Cheese", "Dairy", true, 5);
        let milk_id = milk.id;
        let mut h = harness(vec![milk, cheese]);
        h.controller.initialize().await.unwrap();
        h.controller.set_auto_collapse(false);
        // Re-initializing must not switch it back on.
        h.controller.initialize().await.unwrap();
        assert!(!h.controller.view().options().auto_collapse);
        h.controller.set_sort_key("Department").unwrap();

        assert!(h.controller.toggle_checked(milk_id).await.unwrap());
        assert!(h.controller.view().is_expanded("Dairy"));

        h.controller.set_auto_collapse(true);
        assert!(!h.controller.view().is_expanded("Dairy"));
    }

    #[tokio::test]
    async fn collapse_is_reverted_when_toggle_fails() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let milk_id = milk.id;
        let mut h = harness(vec![milk]);
        h.controller.initialize().await.unwrap();
        h.controller.set_sort_key("Department").unwrap();
        h.controller.api().fail_on("set_checked");

        assert!(h.controller.toggle_checked(milk_id).await.is_err());
        assert!(h.controller.view().is_expanded("Dairy"));
    }

    #[tokio::test]
    async fn fetch_failure_propagates_online_and_serves_cache_offline() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let mut h = harness(vec![milk]);
        h.controller.initialize().await.unwrap();
        h.controller.api().fail_on("get_list");

        let err = h.controller.fetch_data().await.expect_err("online failure");
        assert!(err.is_network());

        h.connectivity.set_offline(true);
        assert_eq!(
            h.controller.fetch_data().await.unwrap(),
            FetchOutcome::Stale
        );
        assert_eq!(visible_names(&h.controller), vec!["Milk"]);

        h.controller.api().heal();
        h.connectivity.set_offline(false);
        assert_eq!(
            h.controller.fetch_data().await.unwrap(),
            FetchOutcome::Fresh
        );
    }

    #[tokio::test]
    async fn initialize_while_offline_succeeds_with_empty_cache() {
        let mut h = harness(Vec::new());
        h.controller.api().fail_on("get_list");
        h.connectivity.set_offline(true);
        assert_eq!(
            h.controller.initialize().await.unwrap(),
            FetchOutcome::Stale
        );
        assert!(h.controller.is_initialized());
        assert!(h.controller.visible().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_refetch_and_propagate_not_found() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let mut h = harness(vec![milk.clone()]);
        h.controller.initialize().await.unwrap();

        let mut edited = milk.clone();
        edited.name = " Oat Milk ".into();
        edited.store = "Costco ".into();
        h.controller.update_item(edited).await.unwrap();
        assert_eq!(h.controller.items()[0].name, "Oat Milk");
        assert_eq!(h.controller.items()[0].store, "Costco");

        h.controller.delete_item(milk.id).await.unwrap();
        assert!(h.controller.items().is_empty());

        let err = h.controller.delete_item(milk.id).await.expect_err("stale id");
        assert!(matches!(err, GroceryError::NotFound(_)));
        let err = h.controller.update_item(milk).await.expect_err("stale id");
        assert!(matches!(err, GroceryError::NotFound(_)));
        assert_eq!(h.controller.action_state(), ActionState::RolledBack);
    }

    #[tokio::test]
    async fn bulk_delete_respects_confirmation_and_filtered_view() {
        let mut costco_milk = make_item("Milk", "Dairy", true, 10);
        costco_milk.store = "Costco".into();
        let mut amazon_soap = make_item("Soap", "Household", true, 10);
        amazon_soap.store = "Amazon".into();
        let mut costco_bread = make_item("Bread", "Bakery", false, 10);
        costco_bread.store = "Costco".into();
        let mut h = harness(vec![costco_milk, amazon_soap, costco_bread]);
        h.controller.initialize().await.unwrap();
        h.controller.set_store_filter(["Costco"]);

        let cancel = ScriptedDialog::confirming(false);
        assert_eq!(
            h.controller.delete_checked_items(&cancel).await.unwrap(),
            BulkDeleteOutcome::Cancelled
        );
        assert_eq!(h.controller.items().len(), 3);

        h.controller.api().fail_on("delete_items");
        let confirm = ScriptedDialog::confirming(true);
        assert!(h.controller.delete_checked_items(&confirm).await.is_err());
        assert_eq!(h.controller.items().len(), 3);
        assert_eq!(h.controller.action_state(), ActionState::RolledBack);

        h.controller.api().heal();
        assert_eq!(
            h.controller.delete_checked_items(&confirm).await.unwrap(),
            BulkDeleteOutcome::Deleted(1)
        );
        let remaining: Vec<&str> = h.controller.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(remaining, vec!["Soap", "Bread"]);
        assert_eq!(h.controller.api().calls().last().unwrap(), "delete_items");

        assert_eq!(
            h.controller.delete_checked_items(&confirm).await.unwrap(),
            BulkDeleteOutcome::NothingChecked
        );
    }

    #[tokio::test]
    async fn item_details_dialog_cancel_unchanged_and_updated() {
        let milk = make_item("Milk", "Dairy", false, 10);
        let mut h = harness(vec![milk.clone()]);
        h.controller.initialize().await.unwrap();

        let cancel = ScriptedDialog::editing(None);
        assert_eq!(
            h.controller.open_item_details(milk.id, &cancel).await.unwrap(),
            EditOutcome::Cancelled
        );

        let same = ScriptedDialog::editing(Some(milk.clone()));
        assert_eq!(
            h.controller.open_item_details(milk.id, &same).await.unwrap(),
            EditOutcome::Unchanged
        );
        assert!(!h.controller.api().calls().contains(&"update_item".to_string()));

        let mut changed = milk.clone();
        changed.quantity = 2;
        changed.high_priority = Some(true);
        let edit = ScriptedDialog::editing(Some(changed));
        assert_eq!(
            h.controller.open_item_details(milk.id, &edit).await.unwrap(),
            EditOutcome::Updated
        );
        assert_eq!(h.controller.items()[0].quantity, 2);
        assert_eq!(h.controller.items()[0].high_priority, Some(true));
    }

    #[tokio::test]
    async fn sort_key_changes_are_validated_and_persisted() {
        let mut h = harness(vec![make_item("Milk", "Dairy", false, 1)]);
        h.controller.initialize().await.unwrap();

        let err = h.controller.set_sort_key("Cheapest").expect_err("unknown");
        assert!(matches!(err, GroceryError::InvalidArgument(_)));
        assert_eq!(h.controller.preferences().sort_by(), SortBy::MostRecent);

        h.controller.set_sort_key("Alphabetical").unwrap();
        assert_eq!(h.controller.preferences().sort_by(), SortBy::Alphabetical);
    }

    #[tokio::test]
    async fn store_filter_mode_toggle_without_filters_is_noop() {
        let mut h = harness(vec![make_item("Milk", "Dairy", false, 1)]);
        h.controller.initialize().await.unwrap();
        let before = h.controller.visible().to_vec();
        assert!(!h.controller.toggle_store_filter_mode());
        assert_eq!(h.controller.visible(), before.as_slice());
    }

    #[tokio::test]
    async fn render_requests_follow_subscriptions_until_dispose() {
        let mut h = harness(Vec::new());
        h.controller.initialize().await.unwrap();
        h.controller.take_render_request();
        assert_eq!(h.connectivity.subscriber_count(), 1);

        h.connectivity.set_offline(true);
        assert!(h.controller.take_render_request());
        assert!(!h.controller.take_render_request());

        h.controller.set_shopping_mode(true);
        assert!(h.controller.take_render_request());

        h.controller.dispose();
        assert_eq!(h.connectivity.subscriber_count(), 0);
        h.connectivity.set_offline(false);
        assert!(!h.controller.take_render_request());
    }

    #[tokio::test]
    async fn add_items_splits_and_quick_add_validates() {
        let mut h = harness(Vec::new());
        h.controller.initialize().await.unwrap();

        let created = h
            .controller
            .add_items("milk, eggs & bread and jam")
            .await
            .unwrap();
        assert_eq!(created.len(), 4);

        assert!(h.controller.quick_add("Caviar").await.is_err());
        h.controller.quick_add("Bananas").await.unwrap();
        assert_eq!(h.controller.items().len(), 5);

        assert_eq!(h.controller.search_known_items("").len(), 5);
        assert_eq!(h.controller.search_known_items("AN"), vec!["Bananas"]);
    }

    #[test]
    fn split_item_names_handles_separators() {
        assert_eq!(
            split_item_names("milk, eggs & bread and jam"),
            vec!["milk", "eggs", "bread", "jam"]
        );
        assert_eq!(split_item_names("Sandwich bread"), vec!["Sandwich bread"]);
        assert_eq!(split_item_names("salt AND pepper"), vec!["salt", "pepper"]);
        assert!(split_item_names(" , & and ").is_empty());
    }
}
