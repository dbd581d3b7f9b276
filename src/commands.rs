use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{GroceryItem, GroceryList, Timestamp};
use crate::state::{AppState, ItemTable};
use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("grocery item {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What a command needs from the process hosting it.
pub trait CommandCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError>;
    fn now(&self) -> Timestamp;
    fn list_name(&self) -> &str;
}

/// Context of the running server: fixed data directory, wall clock.
#[derive(Debug, Clone)]
pub struct ServerCtx {
    data_dir: PathBuf,
    list_name: String,
}

impl ServerCtx {
    pub fn new(data_dir: PathBuf, list_name: String) -> Self {
        Self {
            data_dir,
            list_name,
        }
    }
}

impl CommandCtx for ServerCtx {
    fn data_dir(&self) -> Result<PathBuf, StorageError> {
        Ok(self.data_dir.clone())
    }

    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn list_name(&self) -> &str {
        &self.list_name
    }
}

/// Applies `change` to the item table and writes the result through to disk. On any
/// failure the table is left as it was.
fn persist<T>(
    ctx: &impl CommandCtx,
    state: &AppState,
    change: impl FnOnce(&mut ItemTable) -> Result<T, CommandError>,
) -> Result<T, CommandError> {
    let storage = Storage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    state.transact(change, |file| Ok(storage.save_items(file)?))
}

/// Loads the item table from disk. A missing file is an empty table; a corrupt one is
/// an error so it never gets overwritten.
pub fn load_state_impl(ctx: &impl CommandCtx) -> Result<AppState, CommandError> {
    let storage = Storage::new(ctx.data_dir()?);
    storage.ensure_dirs()?;
    match storage.load_items() {
        Ok(data) => {
            log::info!("loaded {} grocery items", data.items.len());
            Ok(AppState::new(data.items))
        }
        Err(StorageError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
            log::info!("no item table yet, starting empty");
            Ok(AppState::new(Vec::new()))
        }
        Err(error) => Err(error.into()),
    }
}

pub fn get_list_impl(ctx: &impl CommandCtx, state: &AppState) -> GroceryList {
    GroceryList {
        id: Uuid::new_v4(),
        name: ctx.list_name().to_string(),
        description: ctx.now().format("%Y-%m-%d").to_string(),
        grocery_items: state.items(),
    }
}

pub fn add_item_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    item: GroceryItem,
) -> Result<GroceryItem, CommandError> {
    let mut item = item;
    item.normalize();
    if item.name.is_empty() {
        return Err(CommandError::InvalidArgument("item name is required".to_string()));
    }
    let now = ctx.now();
    item.id = Uuid::new_v4();
    item.date_created = now;
    item.date_modified = now;
    let created = persist(ctx, state, |table| {
        table.add_item(item.clone());
        Ok(item)
    })?;
    log::info!("add item id={} name={:?}", created.id, created.name);
    Ok(created)
}

pub fn update_item_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    item: GroceryItem,
) -> Result<GroceryItem, CommandError> {
    let mut item = item;
    item.normalize();
    if item.name.is_empty() {
        return Err(CommandError::InvalidArgument("item name is required".to_string()));
    }
    let id = item.id;
    let now = ctx.now();
    let stored = persist(ctx, state, |table| {
        table
            .update_item(item, now)
            .ok_or(CommandError::NotFound(id))
    })?;
    log::info!("update item id={id}");
    Ok(stored)
}

pub fn set_checked_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    id: Uuid,
    is_checked: bool,
) -> Result<(), CommandError> {
    let now = ctx.now();
    persist(ctx, state, |table| {
        if table.set_checked(id, is_checked, now) {
            Ok(())
        } else {
            Err(CommandError::NotFound(id))
        }
    })?;
    log::info!("set checked id={id} is_checked={is_checked}");
    Ok(())
}

pub fn delete_item_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    id: Uuid,
) -> Result<(), CommandError> {
    persist(ctx, state, |table| {
        if table.remove_item(id) {
            Ok(())
        } else {
            Err(CommandError::NotFound(id))
        }
    })?;
    log::info!("delete item id={id}");
    Ok(())
}

/// Unknown ids are skipped. Returns the number of items removed.
pub fn delete_items_impl(
    ctx: &impl CommandCtx,
    state: &AppState,
    ids: Vec<Uuid>,
) -> Result<usize, CommandError> {
    let removed = persist(ctx, state, |table| Ok(table.remove_items(&ids)))?;
    log::info!("bulk delete requested={} removed={removed}", ids.len());
    Ok(removed)
}
