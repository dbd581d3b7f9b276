//! Client side of the REST API.
//!
//! Paths are lowercase throughout and shared with the server router so the two never
//! drift apart.

use uuid::Uuid;

use crate::error::GroceryError;
use crate::models::{GroceryItem, GroceryList};

pub const GET_GROCERY_LIST: &str = "/api/grocerylist";
pub const ADD_GROCERY_ITEM: &str = "/api/groceryitem";
pub const UPDATE_GROCERY_ITEM: &str = "/api/groceryitem";
pub const UPDATE_GROCERY_ITEM_IS_CHECKED: &str = "/api/groceryitems/{id}/ischecked";
pub const DELETE_GROCERY_ITEM: &str = "/api/groceryitem/{id}";
pub const BULK_DELETE_GROCERY_ITEMS: &str = "/api/groceryitems/bulk-delete";
pub const HEALTH: &str = "/api/health";

pub fn item_path(template: &str, id: Uuid) -> String {
    template.replace("{id}", &id.to_string())
}

/// Maps a non-success status to the error kind the caller acts on.
///
/// `id` names the item the request was about, if any; 404 without an id is treated as
/// a broken endpoint rather than a stale item.
pub fn error_for_status(status: u16, body: &str, id: Option<Uuid>) -> GroceryError {
    match (status, id) {
        (400, _) => GroceryError::InvalidArgument(body.trim().to_string()),
        (401 | 403, _) => GroceryError::Unauthorized,
        (404, Some(id)) => GroceryError::NotFound(id),
        _ => GroceryError::NetworkFailure(format!("http {status}: {}", body.trim())),
    }
}

/// Remote collaborator of the sync controller.
#[allow(async_fn_in_trait)]
pub trait GroceryApi {
    async fn get_list(&self) -> Result<GroceryList, GroceryError>;
    /// Returns the item as stored, with its server-assigned id and timestamps.
    async fn add_item(&self, item: &GroceryItem) -> Result<GroceryItem, GroceryError>;
    async fn update_item(&self, item: &GroceryItem) -> Result<(), GroceryError>;
    async fn set_checked(&self, id: Uuid, is_checked: bool) -> Result<(), GroceryError>;
    async fn delete_item(&self, id: Uuid) -> Result<(), GroceryError>;
    async fn delete_items(&self, ids: &[Uuid]) -> Result<(), GroceryError>;
}

#[cfg(feature = "app")]
pub struct HttpGroceryApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[cfg(feature = "app")]
impl HttpGroceryApi {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, GroceryError> {
        use std::time::Duration;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| GroceryError::NetworkFailure(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        id: Option<Uuid>,
    ) -> Result<reqwest::Response, GroceryError> {
        let resp = builder
            .send()
            .await
            .map_err(|err| GroceryError::NetworkFailure(format!("request failed: {err}")))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        log::warn!("grocery api http {status}: {text}");
        Err(error_for_status(status.as_u16(), &text, id))
    }
}

#[cfg(feature = "app")]
impl GroceryApi for HttpGroceryApi {
    async fn get_list(&self) -> Result<GroceryList, GroceryError> {
        let resp = self
            .send(self.request(reqwest::Method::GET, GET_GROCERY_LIST), None)
            .await?;
        resp.json::<GroceryList>()
            .await
            .map_err(|err| GroceryError::NetworkFailure(format!("invalid grocery list json: {err}")))
    }

    async fn add_item(&self, item: &GroceryItem) -> Result<GroceryItem, GroceryError> {
        let resp = self
            .send(
                self.request(reqwest::Method::POST, ADD_GROCERY_ITEM).json(item),
                None,
            )
            .await?;
        resp.json::<GroceryItem>()
            .await
            .map_err(|err| GroceryError::NetworkFailure(format!("invalid grocery item json: {err}")))
    }

    async fn update_item(&self, item: &GroceryItem) -> Result<(), GroceryError> {
        self.send(
            self.request(reqwest::Method::PUT, UPDATE_GROCERY_ITEM).json(item),
            Some(item.id),
        )
        .await?;
        Ok(())
    }

    async fn set_checked(&self, id: Uuid, is_checked: bool) -> Result<(), GroceryError> {
        let path = item_path(UPDATE_GROCERY_ITEM_IS_CHECKED, id);
        self.send(
            self.request(reqwest::Method::PUT, &path).json(&is_checked),
            Some(id),
        )
        .await?;
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), GroceryError> {
        let path = item_path(DELETE_GROCERY_ITEM, id);
        self.send(self.request(reqwest::Method::DELETE, &path), Some(id))
            .await?;
        Ok(())
    }

    async fn delete_items(&self, ids: &[Uuid]) -> Result<(), GroceryError> {
        self.send(
            self.request(reqwest::Method::POST, BULK_DELETE_GROCERY_ITEMS).json(ids),
            None,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_path_substitutes_id() {
        let id = Uuid::nil();
        assert_eq!(
            item_path(UPDATE_GROCERY_ITEM_IS_CHECKED, id),
            "/api/groceryitems/00000000-0000-0000-0000-000000000000/ischecked"
        );
        assert_eq!(
            item_path(DELETE_GROCERY_ITEM, id),
            "/api/groceryitem/00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn status_mapping_covers_each_error_kind() {
        let id = Uuid::new_v4();
        assert!(matches!(
            error_for_status(400, " name is empty ", None),
            GroceryError::InvalidArgument(ref m) if m == "name is empty"
        ));
        assert!(matches!(error_for_status(401, "", None), GroceryError::Unauthorized));
        assert!(matches!(error_for_status(403, "", Some(id)), GroceryError::Unauthorized));
        assert!(matches!(error_for_status(404, "", Some(id)), GroceryError::NotFound(found) if found == id));
        assert!(error_for_status(404, "", None).is_network());
        assert!(error_for_status(503, "down", Some(id)).is_network());
    }
}
