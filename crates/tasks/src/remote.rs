//! Remote task store
//!
//! CRUD against the backend's `tasks` table. Every query is scoped to
//! the signed-in user, and the `users` row the data references is
//! created on demand before writes.

use chrono::NaiveDate;
use tracing::warn;

use backend::auth::Session;
use backend::{AuthClient, BackendClient, BackendError, RealtimeClient, Subscription};

use crate::error::{TaskError, TaskResult};
use crate::models::{Category, NewTaskRow, Status, Task, TaskDraft, TaskPatch, TaskRow};

const TABLE: &str = "tasks";

/// Remote task store
#[derive(Clone)]
pub struct RemoteTaskStore {
    client: BackendClient,
    auth: AuthClient,
    realtime: RealtimeClient,
}

impl RemoteTaskStore {
    /// Create a new remote task store
    pub fn new(client: BackendClient, auth: AuthClient) -> Self {
        let realtime = RealtimeClient::new(client.config().clone());
        Self {
            client,
            auth,
            realtime,
        }
    }

    /// Session for a read; `None` means signed out, which reads treat
    /// as an empty task set rather than an error.
    async fn read_session(&self) -> TaskResult<Option<Session>> {
        let Some(session) = self.auth.current_session().await? else {
            return Ok(None);
        };
        if let Err(e) = self.auth.ensure_user_row().await {
            warn!("could not ensure users row: {}", e);
        }
        Ok(Some(session))
    }

    /// Session for a write; writes require sign-in and a users row.
    async fn write_session(&self) -> TaskResult<Session> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;
        self.auth.ensure_user_row().await?;
        Ok(session)
    }

    fn scope(session: &Session) -> (String, String) {
        ("user_id".to_string(), format!("eq.{}", session.user.id))
    }

    /// Fetch the user's full task list, ordered by date
    pub async fn fetch_all(&self) -> TaskResult<Vec<Task>> {
        let Some(session) = self.read_session().await? else {
            return Ok(Vec::new());
        };

        let rows: Vec<TaskRow> = self
            .client
            .select_rows(
                Some(&session.access_token),
                TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    Self::scope(&session),
                    ("order".to_string(), "date.asc".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Fetch tasks on one calendar day, ordered by time
    pub async fn fetch_by_date(&self, date: NaiveDate) -> TaskResult<Vec<Task>> {
        let Some(session) = self.read_session().await? else {
            return Ok(Vec::new());
        };

        let rows: Vec<TaskRow> = self
            .client
            .select_rows(
                Some(&session.access_token),
                TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    ("date".to_string(), format!("eq.{date}")),
                    Self::scope(&session),
                    ("order".to_string(), "time.asc".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Fetch tasks in one category, ordered by date
    pub async fn fetch_by_category(&self, category: Category) -> TaskResult<Vec<Task>> {
        let Some(session) = self.read_session().await? else {
            return Ok(Vec::new());
        };

        let rows: Vec<TaskRow> = self
            .client
            .select_rows(
                Some(&session.access_token),
                TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    ("category".to_string(), format!("eq.{}", category.as_str())),
                    Self::scope(&session),
                    ("order".to_string(), "date.asc".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    /// Fetch one task by id
    pub async fn fetch_by_id(&self, id: &str) -> TaskResult<Task> {
        let session = self.write_session().await?;

        let rows: Vec<TaskRow> = self
            .client
            .select_rows(
                Some(&session.access_token),
                TABLE,
                &[
                    ("select".to_string(), "*".to_string()),
                    ("id".to_string(), format!("eq.{id}")),
                    Self::scope(&session),
                ],
            )
            .await?;

        rows.into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Insert a new task and return the created row
    pub async fn insert(&self, draft: &TaskDraft) -> TaskResult<Task> {
        let session = self.write_session().await?;

        let body = NewTaskRow::from_draft(draft, session.user.id);
        let row: TaskRow = self
            .client
            .insert_row(Some(&session.access_token), TABLE, &body)
            .await?;

        Ok(Task::from(row))
    }

    /// Apply a partial update and return the new row
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> TaskResult<Task> {
        let session = self.write_session().await?;

        let rows: Vec<TaskRow> = self
            .client
            .update_rows(
                Some(&session.access_token),
                TABLE,
                &[("id".to_string(), format!("eq.{id}")), Self::scope(&session)],
                patch,
            )
            .await?;

        rows.into_iter()
            .next()
            .map(Task::from)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Delete a task
    pub async fn delete(&self, id: &str) -> TaskResult<()> {
        let session = self.write_session().await?;

        self.client
            .delete_rows(
                Some(&session.access_token),
                TABLE,
                &[("id".to_string(), format!("eq.{id}")), Self::scope(&session)],
            )
            .await?;

        Ok(())
    }

    /// Flip a task's status given its current value
    pub async fn toggle_status(&self, id: &str, current: Status) -> TaskResult<Task> {
        let patch = TaskPatch {
            status: Some(current.toggled()),
            ..Default::default()
        };
        self.update(id, &patch).await
    }

    /// Subscribe to realtime changes of the user's tasks
    pub async fn subscribe(&self) -> TaskResult<Subscription> {
        let session = self
            .auth
            .current_session()
            .await?
            .ok_or(BackendError::NotSignedIn)?;

        Ok(self.realtime.subscribe(TABLE, session.user.id).await?)
    }
}
