//! Custom error types for task storage

use thiserror::Error;

/// Custom error type for task operations
#[derive(Error, Debug)]
pub enum TaskError {
    /// Remote store failure
    #[error(transparent)]
    Backend(#[from] backend::BackendError),

    /// Local store failure
    #[error(transparent)]
    Store(#[from] common::error::StoreError),

    /// No task with the given id
    #[error("task not found: {0}")]
    NotFound(String),

    /// The task data failed validation
    #[error("invalid task: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Type alias for Result with TaskError
pub type TaskResult<T> = Result<T, TaskError>;
