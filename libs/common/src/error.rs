//! Custom error types for the common library
//!
//! This module defines the error type shared by the local store and
//! configuration code.

use thiserror::Error;

/// Custom error type for local store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while reading or writing a store file
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error occurred while serializing or deserializing store data
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store directory cannot be used
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
