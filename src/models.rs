use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::GroceryError;

pub type Timestamp = DateTime<Utc>;

pub const KNOWN_STORES: [&str; 11] = [
    "Costco",
    "Super Store",
    "Shoppers Drug Mart",
    "Amazon",
    "Best Buy",
    "Canadian Tire",
    "Home Depot",
    "Marks",
    "Sport Chek",
    "PetSmart",
    "Other",
];

pub const KNOWN_DEPARTMENTS: [&str; 15] = [
    "Produce",
    "Dry Goods",
    "Beverages",
    "Baking",
    "Frozen",
    "Dairy",
    "Bakery",
    "Meat",
    "Deli",
    "Seafood",
    "Household",
    "Health & Beauty",
    "Pet",
    "Alcohol",
    "Other",
];

pub const QUICK_ADD_ITEMS: [&str; 13] = [
    "Apples",
    "Bananas",
    "Grapes",
    "Kleenex",
    "Toilet Paper",
    "Milk",
    "Cream",
    "Butter",
    "Beef",
    "Chicken",
    "Peanut Butter",
    "Jam",
    "Tomato Sauce",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    /// Assigned by the server. `Uuid::nil()` until the item has been created.
    pub id: Uuid,
    pub name: String,
    pub date_created: Timestamp,
    pub date_modified: Timestamp,
    pub is_checked: bool,
    #[serde(default)]
    pub store: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub quantity_type: String,
    /// `Some(true)` urgent, `Some(false)` explicitly low, `None` neutral.
    #[serde(default)]
    pub high_priority: Option<bool>,
}

impl GroceryItem {
    /// Candidate item for a create request: sentinel id, unchecked, trimmed name.
    pub fn candidate(name: &str, now: Timestamp) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.trim().to_string(),
            date_created: now,
            date_modified: now,
            is_checked: false,
            store: String::new(),
            brand: String::new(),
            department: String::new(),
            quantity: 0,
            quantity_type: String::new(),
            high_priority: None,
        }
    }

    /// Trims every free-text field in place.
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.store = self.store.trim().to_string();
        self.brand = self.brand.trim().to_string();
        self.department = self.department.trim().to_string();
        self.quantity_type = self.quantity_type.trim().to_string();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryList {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub grocery_items: Vec<GroceryItem>,
}

impl Default for GroceryList {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            description: String::new(),
            grocery_items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    MostRecent,
    Priority,
    Department,
    DepartmentAndPriority,
    Alphabetical,
}

impl SortBy {
    pub const ALL: [SortBy; 5] = [
        SortBy::MostRecent,
        SortBy::Priority,
        SortBy::Department,
        SortBy::DepartmentAndPriority,
        SortBy::Alphabetical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::MostRecent => "Most Recent",
            SortBy::Priority => "Priority",
            SortBy::Department => "Department",
            SortBy::DepartmentAndPriority => "Department & Priority",
            SortBy::Alphabetical => "Alphabetical",
        }
    }

    /// Department grouping (and auto-collapse) only applies to the plain department sort.
    pub fn groups_by_department(self) -> bool {
        matches!(self, SortBy::Department)
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = GroceryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SortBy::ALL
            .into_iter()
            .find(|sort| sort.as_str() == value)
            .ok_or_else(|| GroceryError::InvalidArgument(format!("unexpected sort by value: {value}")))
    }
}

impl Serialize for SortBy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SortBy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreFilterMode {
    #[default]
    Include,
    Exclude,
}

impl StoreFilterMode {
    pub fn toggled(self) -> Self {
        match self {
            StoreFilterMode::Include => StoreFilterMode::Exclude,
            StoreFilterMode::Exclude => StoreFilterMode::Include,
        }
    }
}

/// Persisted shape of the user's sort and filter choices.
///
/// `sort_by` stays a raw string on disk so a value written by a newer client does not
/// make the whole preference file unreadable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterPreferences {
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default)]
    pub filter_stores: Vec<String>,
    #[serde(default)]
    pub filter_departments: Vec<String>,
}

impl Default for FilterPreferences {
    fn default() -> Self {
        Self {
            sort_by: default_sort_by(),
            filter_stores: Vec::new(),
            filter_departments: Vec::new(),
        }
    }
}

impl FilterPreferences {
    pub fn store_set(&self) -> BTreeSet<String> {
        self.filter_stores.iter().cloned().collect()
    }

    pub fn department_set(&self) -> BTreeSet<String> {
        self.filter_departments.iter().cloned().collect()
    }
}

fn default_sort_by() -> String {
    SortBy::default().as_str().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ItemsFile {
    pub schema_version: u32,
    pub items: Vec<GroceryItem>,
}
