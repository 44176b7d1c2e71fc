//! Custom error types for backend operations

use thiserror::Error;

/// Custom error type for calls against the hosted backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error description from the response body
        message: String,
    },

    /// JSON serialization/deserialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local session persistence failure
    #[error("Session store error: {0}")]
    Store(#[from] common::error::StoreError),

    /// Input rejected before any request was made
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// The operation requires an authenticated user
    #[error("not signed in")]
    NotSignedIn,

    /// Realtime channel failure
    #[error("Realtime error: {0}")]
    Realtime(String),
}

/// Type alias for Result with BackendError
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = BackendError::Api {
            status: 401,
            message: "invalid credentials".to_string(),
        };
        assert_eq!(err.to_string(), "Backend error (401): invalid credentials");
    }

    #[test]
    fn test_not_signed_in_display() {
        assert_eq!(BackendError::NotSignedIn.to_string(), "not signed in");
    }
}
