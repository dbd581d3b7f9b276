//! Derivation of the displayed list from the cached items.
//!
//! The pipeline is filter, then sort, then group-expansion recompute. Sorting always
//! puts unchecked items first, then applies the secondary key of the selected
//! [`SortBy`], then falls back to most recently modified first.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::GroceryError;
use crate::models::{GroceryItem, SortBy, StoreFilterMode};
use crate::preferences::PreferenceStore;

/// Department name to expanded flag.
pub type ExpansionMap = BTreeMap<String, bool>;

/// Rank used for unknown departments; sorts after every known one.
pub const UNKNOWN_DEPARTMENT_RANK: u32 = u32::MAX;

pub fn department_rank(department: &str) -> u32 {
    match department {
        "Produce" => 1,
        "Bakery" => 2,
        "Pet" => 3,
        "Beverages" => 4,
        "Household" => 5,
        "Other" => 6,
        "Dry Goods" => 7,
        "Baking" => 8,
        "Health & Beauty" => 9,
        "Frozen" => 10,
        "Seafood" => 11,
        "Dairy" => 12,
        "Meat" => 13,
        "Deli" => 14,
        "Alcohol" => 15,
        _ => UNKNOWN_DEPARTMENT_RANK,
    }
}

pub fn priority_rank(high_priority: Option<bool>) -> u8 {
    match high_priority {
        Some(true) => 1,
        None => 2,
        Some(false) => 3,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub sort_by: SortBy,
    pub store_filter: BTreeSet<String>,
    pub department_filter: BTreeSet<String>,
    pub store_filter_mode: StoreFilterMode,
    pub auto_collapse: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            sort_by: SortBy::default(),
            store_filter: BTreeSet::new(),
            department_filter: BTreeSet::new(),
            store_filter_mode: StoreFilterMode::Include,
            auto_collapse: true,
        }
    }
}

impl ViewOptions {
    fn keeps(&self, item: &GroceryItem) -> bool {
        let store_ok = self.store_filter.is_empty()
            || match self.store_filter_mode {
                StoreFilterMode::Include => self.store_filter.contains(&item.store),
                StoreFilterMode::Exclude => !self.store_filter.contains(&item.store),
            };
        let department_ok =
            self.department_filter.is_empty() || self.department_filter.contains(&item.department);
        store_ok && department_ok
    }

    fn grouping_active(&self) -> bool {
        self.sort_by.groups_by_department() && self.auto_collapse
    }
}

pub fn filter_items(items: &[GroceryItem], options: &ViewOptions) -> Vec<GroceryItem> {
    items
        .iter()
        .filter(|item| options.keeps(item))
        .cloned()
        .collect()
}

pub fn compare_items(a: &GroceryItem, b: &GroceryItem, sort_by: SortBy) -> Ordering {
    let secondary = match sort_by {
        SortBy::MostRecent => Ordering::Equal,
        SortBy::Priority => priority_rank(a.high_priority).cmp(&priority_rank(b.high_priority)),
        SortBy::Department => department_rank(&a.department).cmp(&department_rank(&b.department)),
        SortBy::DepartmentAndPriority => department_rank(&a.department)
            .cmp(&department_rank(&b.department))
            .then_with(|| priority_rank(a.high_priority).cmp(&priority_rank(b.high_priority))),
        SortBy::Alphabetical => a.name.cmp(&b.name),
    };
    a.is_checked
        .cmp(&b.is_checked)
        .then(secondary)
        .then_with(|| b.date_modified.cmp(&a.date_modified))
}

pub fn sort_items(items: &mut [GroceryItem], sort_by: SortBy) {
    items.sort_by(|a, b| compare_items(a, b, sort_by));
}

/// Expanded iff at least one item of the department is still unchecked.
pub fn recompute_expansion(items: &[GroceryItem], expansion: &mut ExpansionMap) {
    let mut all_checked: BTreeMap<&str, bool> = BTreeMap::new();
    for item in items {
        let entry = all_checked.entry(item.department.as_str()).or_insert(true);
        *entry &= item.is_checked;
    }
    for (department, checked) in all_checked {
        expansion.insert(department.to_string(), !checked);
    }
}

#[derive(Debug, PartialEq)]
pub struct DepartmentGroup<'a> {
    pub department: &'a str,
    pub expanded: bool,
    pub items: Vec<&'a GroceryItem>,
}

/// Filter/sort state plus the last derived view.
#[derive(Debug, Default)]
pub struct ViewEngine {
    options: ViewOptions,
    expansion: ExpansionMap,
    visible: Vec<GroceryItem>,
}

impl ViewEngine {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            options,
            expansion: ExpansionMap::new(),
            visible: Vec::new(),
        }
    }

    pub fn from_preferences(preferences: &PreferenceStore) -> Self {
        let filters = preferences.filters();
        Self::new(ViewOptions {
            sort_by: preferences.sort_by(),
            store_filter: filters.store_set(),
            department_filter: filters.department_set(),
            ..ViewOptions::default()
        })
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn visible(&self) -> &[GroceryItem] {
        &self.visible
    }

    pub fn expansion(&self) -> &ExpansionMap {
        &self.expansion
    }

    /// Departments never seen are treated as expanded.
    pub fn is_expanded(&self, department: &str) -> bool {
        self.expansion.get(department).copied().unwrap_or(true)
    }

    /// Parses and selects a sort key. An unknown key leaves the current state untouched.
    pub fn set_sort_key(&mut self, value: &str) -> Result<SortBy, GroceryError> {
        let sort_by: SortBy = value.parse()?;
        self.options.sort_by = sort_by;
        Ok(sort_by)
    }

    pub fn set_store_filter<I, S>(&mut self, stores: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.store_filter = stores.into_iter().map(Into::into).collect();
    }

    pub fn set_department_filter<I, S>(&mut self, departments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.department_filter = departments.into_iter().map(Into::into).collect();
    }

    /// Flips include/exclude. Returns false, and changes nothing, when no store is selected.
    pub fn toggle_store_filter_mode(&mut self) -> bool {
        if self.options.store_filter.is_empty() {
            return false;
        }
        self.options.store_filter_mode = self.options.store_filter_mode.toggled();
        true
    }

    pub fn set_auto_collapse(&mut self, enabled: bool) {
        self.options.auto_collapse = enabled;
    }

    pub fn set_group_expanded(&mut self, department: &str, expanded: bool) {
        self.expansion.insert(department.to_string(), expanded);
    }

    /// Saves the selection if it drifted from the stored preference, then re-derives the view.
    pub fn apply(&mut self, items: &[GroceryItem], preferences: &mut PreferenceStore) {
        let options = &self.options;
        if preferences.diverges_from(
            options.sort_by,
            &options.store_filter,
            &options.department_filter,
        ) {
            preferences.update_filters(
                options.sort_by,
                &options.store_filter,
                &options.department_filter,
            );
        }
        self.derive(items);
    }

    /// Filter, sort and expansion recompute without touching preferences.
    pub fn derive(&mut self, items: &[GroceryItem]) {
        let mut visible = filter_items(items, &self.options);
        sort_items(&mut visible, self.options.sort_by);
        self.visible = visible;
        if self.options.grouping_active() {
            recompute_expansion(&self.visible, &mut self.expansion);
        }
    }

    /// Collapse or re-expand the department of an item whose checked flag just changed.
    pub fn collapse_completed_department(&mut self, department: &str, is_checked: bool) {
        if !self.options.grouping_active() {
            return;
        }
        let mut department_items = self
            .visible
            .iter()
            .filter(|item| item.department == department)
            .peekable();
        let has_items = department_items.peek().is_some();
        if has_items && department_items.all(|item| item.is_checked) {
            self.expansion.insert(department.to_string(), false);
        } else if !is_checked {
            self.expansion.insert(department.to_string(), true);
        }
    }

    /// Visible items grouped by department in order of first appearance.
    pub fn groups(&self) -> Vec<DepartmentGroup<'_>> {
        let mut groups: Vec<DepartmentGroup<'_>> = Vec::new();
        for item in &self.visible {
            match groups
                .iter_mut()
                .find(|group| group.department == item.department)
            {
                Some(group) => group.items.push(item),
                None => groups.push(DepartmentGroup {
                    department: &item.department,
                    expanded: self.is_expanded(&item.department),
                    items: vec![item],
                }),
            }
        }
        groups
    }
}
