use crate::models::GroceryItem;

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub yes_text: String,
    pub cancel_text: String,
}

impl ConfirmRequest {
    pub fn delete_checked() -> Self {
        Self {
            title: "Delete Checked Items".to_string(),
            message: "Are you sure you want to permanently remove all completed items from your list?"
                .to_string(),
            yes_text: "Delete".to_string(),
            cancel_text: "Cancel".to_string(),
        }
    }
}

/// Modal dialogs shown by the UI layer.
#[allow(async_fn_in_trait)]
pub trait DialogService {
    /// True only when the user picked the "yes" button.
    async fn confirm(&self, request: &ConfirmRequest) -> bool;

    /// Item details editor pre-populated with `item`. `None` means cancelled.
    /// `known_names` backs the name autocomplete.
    async fn edit_item(&self, item: &GroceryItem, known_names: &[String]) -> Option<GroceryItem>;
}
