//! Task manager: the synchronization core
//!
//! Chooses the online or offline backend, applies mutations, and keeps
//! an in-memory task list as the cache the queries read from. Online
//! mutations write remotely and then reload the entire list from the
//! backend; nothing is patched incrementally, so the cache can never
//! drift from the authoritative store by more than one reload.
//!
//! Failure policy: a remote failure is reported once to the registered
//! error listeners and the call returns its null/false signal. There is
//! no retry and no backoff; the caller may simply try again.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use backend::{AuthClient, Subscription};

use crate::error::TaskError;
use crate::local::LocalTaskStore;
use crate::models::{Category, Status, Task, TaskDraft, TaskPatch};
use crate::remote::RemoteTaskStore;
use crate::validation::validate_draft;

type ErrorListener = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Aggregate numbers over the cached task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Completed share as an integer percentage
    pub completion_rate: u32,
    pub by_category: HashMap<Category, usize>,
}

/// Task manager
pub struct TaskManager {
    remote: RemoteTaskStore,
    local: LocalTaskStore,
    tasks: Vec<Task>,
    online: bool,
    listeners: Vec<ErrorListener>,
}

impl TaskManager {
    /// Create a manager with an explicit mode
    pub fn new(remote: RemoteTaskStore, local: LocalTaskStore, online: bool) -> Self {
        Self {
            remote,
            local,
            tasks: Vec::new(),
            online,
            listeners: Vec::new(),
        }
    }

    /// Create a manager whose default mode follows the auth state:
    /// online when a session is persisted, offline otherwise
    pub fn with_default_mode(
        remote: RemoteTaskStore,
        local: LocalTaskStore,
        auth: &AuthClient,
    ) -> Self {
        let online = auth.has_persisted_session();
        info!(
            "task manager starting in {} mode",
            if online { "online" } else { "offline" }
        );
        Self::new(remote, local, online)
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) {
        info!("switching to {} mode", if online { "online" } else { "offline" });
        self.online = online;
    }

    /// Register an error listener, called with `(operation, message)`
    pub fn on_error<F>(&mut self, listener: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Report a failure to every listener, isolating listener panics
    fn report(&self, operation: &str, message: &str) {
        warn!("{} failed: {}", operation, message);
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(operation, message)
            }));
        }
    }

    /// Load the full task list from the active backend
    ///
    /// In online mode a remote failure falls back to whatever the local
    /// store holds, so the user still sees their last-known tasks.
    pub async fn load(&mut self) -> Vec<Task> {
        if self.online {
            match self.remote.fetch_all().await {
                Ok(tasks) => self.tasks = tasks,
                Err(e) => {
                    self.report("load", &e.to_string());
                    self.tasks = self.local.load_or_empty();
                }
            }
        } else {
            self.tasks = self.local.load_or_empty();
        }

        self.tasks.clone()
    }

    /// Reload the authoritative list after an online mutation
    async fn reload_after_mutation(&mut self) {
        match self.remote.fetch_all().await {
            Ok(tasks) => self.tasks = tasks,
            // The write itself succeeded; stale cache until next load.
            Err(e) => self.report("load", &e.to_string()),
        }
    }

    /// Persist the offline list, reporting (not propagating) failures
    fn persist_offline(&self, operation: &str) {
        if let Err(e) = self.local.save(&self.tasks) {
            self.report(operation, &e.to_string());
        }
    }

    /// Create a task; returns the new id, or `None` on failure
    pub async fn create(&mut self, draft: TaskDraft) -> Option<String> {
        let problems = validate_draft(&draft);
        if !problems.is_empty() {
            self.report("create", &TaskError::Validation(problems).to_string());
            return None;
        }

        if self.online {
            match self.remote.insert(&draft).await {
                Ok(task) => {
                    let id = task.id.clone();
                    self.reload_after_mutation().await;
                    Some(id)
                }
                Err(e) => {
                    self.report("create", &e.to_string());
                    None
                }
            }
        } else {
            let now = Utc::now();
            let (work_start, work_end) = match draft.category {
                Category::Work => (draft.work_start, draft.work_end),
                Category::Life => (None, None),
            };
            let task = Task {
                id: Uuid::new_v4().to_string(),
                title: draft.title,
                date: draft.date,
                time: draft.time,
                category: draft.category,
                status: Status::Pending,
                work_start,
                work_end,
                created_at: now,
                updated_at: now,
            };
            let id = task.id.clone();
            self.tasks.push(task);
            self.persist_offline("create");
            Some(id)
        }
    }

    /// Apply a partial update; returns whether it took effect
    pub async fn update(&mut self, id: &str, patch: TaskPatch) -> bool {
        if self.online {
            match self.remote.update(id, &patch).await {
                Ok(_) => {
                    self.reload_after_mutation().await;
                    true
                }
                Err(e) => {
                    self.report("update", &e.to_string());
                    false
                }
            }
        } else {
            let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
                self.report("update", &TaskError::NotFound(id.to_string()).to_string());
                return false;
            };
            patch.apply_to(task);
            task.updated_at = Utc::now();
            self.persist_offline("update");
            true
        }
    }

    /// Delete a task; returns whether it took effect
    pub async fn delete(&mut self, id: &str) -> bool {
        if self.online {
            match self.remote.delete(id).await {
                Ok(()) => {
                    self.reload_after_mutation().await;
                    true
                }
                Err(e) => {
                    self.report("delete", &e.to_string());
                    false
                }
            }
        } else {
            let before = self.tasks.len();
            self.tasks.retain(|t| t.id != id);
            if self.tasks.len() == before {
                self.report("delete", &TaskError::NotFound(id.to_string()).to_string());
                return false;
            }
            self.persist_offline("delete");
            true
        }
    }

    /// Flip a task between pending and completed
    pub async fn toggle_status(&mut self, id: &str) -> bool {
        let Some(current) = self.get(id).map(|t| t.status) else {
            self.report(
                "toggle_status",
                &TaskError::NotFound(id.to_string()).to_string(),
            );
            return false;
        };

        if self.online {
            match self.remote.toggle_status(id, current).await {
                Ok(_) => {
                    self.reload_after_mutation().await;
                    true
                }
                Err(e) => {
                    self.report("toggle_status", &e.to_string());
                    false
                }
            }
        } else {
            let patch = TaskPatch {
                status: Some(current.toggled()),
                ..Default::default()
            };
            self.update(id, patch).await
        }
    }

    /// Cached task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Snapshot of the cached list
    pub fn all(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Tasks on one day; online mode asks the backend directly
    pub async fn tasks_by_date(&self, date: NaiveDate) -> Vec<Task> {
        if self.online {
            match self.remote.fetch_by_date(date).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    self.report("tasks_by_date", &e.to_string());
                    Vec::new()
                }
            }
        } else {
            self.tasks.iter().filter(|t| t.date == date).cloned().collect()
        }
    }

    /// Tasks in one category; online mode asks the backend directly
    pub async fn tasks_by_category(&self, category: Category) -> Vec<Task> {
        if self.online {
            match self.remote.fetch_by_category(category).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    self.report("tasks_by_category", &e.to_string());
                    Vec::new()
                }
            }
        } else {
            self.tasks
                .iter()
                .filter(|t| t.category == category)
                .cloned()
                .collect()
        }
    }

    /// Cached tasks with the given status
    pub fn tasks_by_status(&self, status: Status) -> Vec<Task> {
        self.tasks.iter().filter(|t| t.status == status).cloned().collect()
    }

    /// Cached tasks within an inclusive date range
    pub fn tasks_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect()
    }

    /// Cached tasks due today (local calendar day)
    pub fn today_tasks(&self) -> Vec<Task> {
        let today = Local::now().date_naive();
        self.tasks.iter().filter(|t| t.date == today).cloned().collect()
    }

    /// Tasks in the current week, Sunday through Saturday
    pub async fn week_tasks(&self) -> Vec<Task> {
        let today = Local::now().date_naive();
        let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
        let end = start + Duration::days(6);

        if self.online {
            match self.remote.fetch_all().await {
                Ok(tasks) => tasks
                    .into_iter()
                    .filter(|t| t.date >= start && t.date <= end)
                    .collect(),
                Err(e) => {
                    self.report("week_tasks", &e.to_string());
                    Vec::new()
                }
            }
        } else {
            self.tasks_by_date_range(start, end)
        }
    }

    /// Case-insensitive title search over the cache
    pub fn search(&self, query: &str) -> Vec<Task> {
        let needle = query.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Aggregate statistics over the cache
    pub fn stats(&self) -> TaskStats {
        let total = self.tasks.len();
        let completed = self
            .tasks
            .iter()
            .filter(|t| t.status == Status::Completed)
            .count();

        let mut by_category = HashMap::new();
        for task in &self.tasks {
            *by_category.entry(task.category).or_insert(0) += 1;
        }

        TaskStats {
            total,
            completed,
            pending: total - completed,
            completion_rate: if total > 0 {
                ((completed as f64 / total as f64) * 100.0).round() as u32
            } else {
                0
            },
            by_category,
        }
    }

    /// Remove every task; refused online to prevent accidental wipes
    pub async fn clear_all(&mut self) -> bool {
        if self.online {
            self.report("clear_all", "clearing all tasks is not supported in online mode");
            false
        } else {
            self.tasks.clear();
            self.persist_offline("clear_all");
            true
        }
    }

    /// Subscribe to realtime task changes
    ///
    /// The caller reloads on every event; redundant reloads are the
    /// accepted cost of keeping the cache fresh, last reload wins.
    pub async fn subscribe_changes(&self) -> Option<Subscription> {
        if !self.online {
            return None;
        }

        match self.remote.subscribe().await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                self.report("subscribe", &e.to_string());
                None
            }
        }
    }
}
