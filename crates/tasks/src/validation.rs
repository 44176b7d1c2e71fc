//! Input validation for task data

use chrono::NaiveTime;

use crate::models::{Category, TaskDraft};

/// Validate a task title
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }

    Ok(())
}

/// Validate a work-shift time pair
///
/// Only rejects when both ends are present and out of order; a single
/// end is allowed, matching what the planner UI always permitted.
pub fn validate_work_hours(
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<(), String> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err("Work start time must be before work end time".to_string());
        }
    }

    Ok(())
}

/// Validate a whole draft, collecting every failure
pub fn validate_draft(draft: &TaskDraft) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(problem) = validate_title(&draft.title) {
        problems.push(problem);
    }

    if draft.category == Category::Work {
        if let Err(problem) = validate_work_hours(draft.work_start, draft.work_end) {
            problems.push(problem);
        }
    }

    problems
}
