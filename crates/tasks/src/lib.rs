//! Task management core
//!
//! Dual-mode task storage: online against the hosted backend's `tasks`
//! table, offline against the local store. The [`manager::TaskManager`]
//! picks the backend, applies mutations, and keeps its in-memory list
//! in sync by reloading the full list after every online mutation.

pub mod error;
pub mod local;
pub mod manager;
pub mod models;
pub mod remote;
pub mod validation;

pub use error::{TaskError, TaskResult};
pub use local::LocalTaskStore;
pub use manager::{TaskManager, TaskStats};
pub use models::{Category, Status, Task, TaskDraft, TaskPatch};
pub use remote::RemoteTaskStore;
