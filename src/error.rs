use thiserror::Error;
use uuid::Uuid;

/// Failure of a single user action. None of these are fatal to the process.
#[derive(Error, Debug)]
pub enum GroceryError {
    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("grocery item {0} not found")]
    NotFound(Uuid),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl GroceryError {
    pub fn is_network(&self) -> bool {
        matches!(self, GroceryError::NetworkFailure(_))
    }
}
