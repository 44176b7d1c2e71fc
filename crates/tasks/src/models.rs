//! Task model and its wire representation
//!
//! The remote table uses snake_case column names (`work_start_time`,
//! `work_end_time`) and carries the owning `user_id`; the domain type
//! drops the scoping column and uses the client-side field names.
//! [`TaskRow`] is the wire shape, with conversions both ways.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Task category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Life,
    Work,
}

impl Category {
    /// Column value used in remote filters
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Life => "life",
            Category::Work => "work",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task completion status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    /// The other status
    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Completed,
            Status::Completed => Status::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Calendar day, the primary grouping key
    pub date: NaiveDate,
    /// Optional time of day
    pub time: Option<NaiveTime>,
    pub category: Category,
    pub status: Status,
    /// Shift start, work tasks only
    pub work_start: Option<NaiveTime>,
    /// Shift end, work tasks only
    pub work_end: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New task payload
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub category: Category,
    pub work_start: Option<NaiveTime>,
    pub work_end: Option<NaiveTime>,
}

/// Partial task update
///
/// Serializes straight into a remote PATCH body: absent fields are
/// omitted, present fields use the remote column names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(rename = "work_start_time", skip_serializing_if = "Option::is_none")]
    pub work_start: Option<NaiveTime>,
    #[serde(rename = "work_end_time", skip_serializing_if = "Option::is_none")]
    pub work_end: Option<NaiveTime>,
}

impl TaskPatch {
    /// Whether the patch changes anything
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.work_start.is_none()
            && self.work_end.is_none()
    }

    /// Apply the patch to a task in place (offline path)
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(time) = self.time {
            task.time = Some(time);
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(start) = self.work_start {
            task.work_start = Some(start);
        }
        if let Some(end) = self.work_end {
            task.work_end = Some(end);
        }
    }
}

/// Row ids may come back as uuids or integers depending on the table
/// definition; either way they are opaque strings to the client.
fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected id value: {other}"
        ))),
    }
}

/// Wire shape of a `tasks` row
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub category: Category,
    pub status: Status,
    #[serde(default)]
    pub work_start_time: Option<NaiveTime>,
    #[serde(default)]
    pub work_end_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            date: row.date,
            time: row.time,
            category: row.category,
            status: row.status,
            work_start: row.work_start_time,
            work_end: row.work_end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert body for a new `tasks` row
///
/// Optional times are omitted rather than sent empty; the backend
/// rejects empty strings for time columns.
#[derive(Debug, Clone, Serialize)]
pub struct NewTaskRow {
    pub user_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    pub category: Category,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_end_time: Option<NaiveTime>,
}

impl NewTaskRow {
    /// Build the insert body for a draft owned by `user_id`
    pub fn from_draft(draft: &TaskDraft, user_id: Uuid) -> Self {
        // Work-shift times only make sense on work tasks.
        let (work_start, work_end) = match draft.category {
            Category::Work => (draft.work_start, draft.work_end),
            Category::Life => (None, None),
        };

        NewTaskRow {
            user_id,
            title: draft.title.clone(),
            date: draft.date,
            time: draft.time,
            category: draft.category,
            status: Status::Pending,
            work_start_time: work_start,
            work_end_time: work_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uid() -> Uuid {
        "1f8e8d9a-2b4c-4a6e-9d3f-5c7b8a9e0f1a".parse().unwrap()
    }

    #[test]
    fn test_row_to_task_translates_column_names() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": "t-1",
            "user_id": uid(),
            "title": "morning shift",
            "date": "2026-09-01",
            "time": null,
            "category": "work",
            "status": "pending",
            "work_start_time": "09:00:00",
            "work_end_time": "17:30:00",
            "created_at": "2026-08-31T12:00:00Z",
            "updated_at": "2026-08-31T12:00:00Z"
        }))
        .unwrap();

        let task = Task::from(row);
        assert_eq!(task.id, "t-1");
        assert_eq!(task.category, Category::Work);
        assert_eq!(task.work_start, Some("09:00:00".parse().unwrap()));
        assert_eq!(task.work_end, Some("17:30:00".parse().unwrap()));
    }

    #[test]
    fn test_numeric_row_id_becomes_string() {
        let row: TaskRow = serde_json::from_value(json!({
            "id": 42,
            "title": "x",
            "date": "2026-09-01",
            "category": "life",
            "status": "pending",
            "created_at": "2026-08-31T12:00:00Z",
            "updated_at": "2026-08-31T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.id, "42");
    }

    #[test]
    fn test_new_row_omits_absent_times() {
        let draft = TaskDraft {
            title: "groceries".to_string(),
            date: "2026-09-01".parse().unwrap(),
            category: Category::Life,
            ..Default::default()
        };

        let body = serde_json::to_value(NewTaskRow::from_draft(&draft, uid())).unwrap();
        let object = body.as_object().unwrap();
        assert!(!object.contains_key("time"));
        assert!(!object.contains_key("work_start_time"));
        assert!(!object.contains_key("work_end_time"));
        assert_eq!(object["status"], "pending");
    }

    #[test]
    fn test_new_row_drops_work_times_for_life_tasks() {
        let draft = TaskDraft {
            title: "walk".to_string(),
            date: "2026-09-01".parse().unwrap(),
            category: Category::Life,
            work_start: Some("09:00:00".parse().unwrap()),
            work_end: Some("17:00:00".parse().unwrap()),
            ..Default::default()
        };

        let body = serde_json::to_value(NewTaskRow::from_draft(&draft, uid())).unwrap();
        assert!(!body.as_object().unwrap().contains_key("work_start_time"));
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = TaskPatch {
            status: Some(Status::Completed),
            work_start: Some("08:00:00".parse().unwrap()),
            ..Default::default()
        };

        let body = serde_json::to_value(&patch).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["status"], "completed");
        assert_eq!(object["work_start_time"], "08:00:00");
    }

    #[test]
    fn test_status_toggled_twice_is_identity() {
        assert_eq!(Status::Pending.toggled().toggled(), Status::Pending);
        assert_eq!(Status::Completed.toggled(), Status::Pending);
    }
}
