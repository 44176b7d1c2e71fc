use backend::BackendError;
use common::error::StoreError;
use thiserror::Error;

/// Errors produced by the food, cart and order layer.
#[derive(Debug, Error)]
pub enum FoodError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("food not found: {0}")]
    NotFound(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid food: {0}")]
    Validation(String),
}

pub type FoodResult<T> = Result<T, FoodError>;
