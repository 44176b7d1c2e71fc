//! Local task store for offline use
//!
//! Persists the whole task list as one JSON document, the same shape
//! the in-memory cache holds.

use common::error::StoreResult;
use common::store::{LocalStore, keys};

use crate::models::Task;

/// Task persistence in the local store
#[derive(Debug, Clone)]
pub struct LocalTaskStore {
    store: LocalStore,
}

impl LocalTaskStore {
    /// Create a new local task store
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Load the persisted task list, empty when nothing was saved yet
    pub fn load_or_empty(&self) -> Vec<Task> {
        self.store.load(keys::TASKS).unwrap_or_default()
    }

    /// Persist the whole task list
    pub fn save(&self, tasks: &[Task]) -> StoreResult<()> {
        self.store.save(keys::TASKS, &tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Status};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: "morning shift".to_string(),
            date: "2026-09-01".parse().unwrap(),
            time: Some("08:30:00".parse().unwrap()),
            category: Category::Work,
            status: Status::Pending,
            work_start: Some("09:00:00".parse().unwrap()),
            work_end: Some("17:30:00".parse().unwrap()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_store_loads_empty_list() {
        let dir = TempDir::new().unwrap();
        let store = LocalTaskStore::new(LocalStore::new(dir.path()));
        assert!(store.load_or_empty().is_empty());
    }

    #[test]
    fn test_task_list_roundtrips_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = LocalTaskStore::new(LocalStore::new(dir.path()));

        let tasks = vec![sample_task("a"), sample_task("b")];
        store.save(&tasks).unwrap();

        assert_eq!(store.load_or_empty(), tasks);
    }
}
