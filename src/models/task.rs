use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Prefix of every generated task id.
pub const TASK_ID_PREFIX: &str = "t_";

/// Payload of `POST /v1/tasks`.
/// Missing fields fall back to their defaults so an absent title is reported
/// by validation instead of by the JSON decoder.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct CreateTaskInput {
    /// Required, must not be empty.
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Free-form; stored and returned verbatim.
    #[serde(default)]
    pub due_date: Option<String>,
}

/// Payload of `PATCH /v1/tasks/{id}`. Only the supplied fields are changed.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub done: Option<bool>,
}

/// A task as stored in the `tasks` table and returned by the API.
///
/// The timestamps are bookkeeping for the service layer and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// `t_` followed by a UUID v4.
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub done: bool,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Query string of `GET /v1/tasks/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    /// Only the literal `true` enables the injectable search.
    #[serde(rename = "unsafe")]
    pub unsafe_mode: Option<String>,
}

impl SearchQuery {
    pub fn is_unsafe(&self) -> bool {
        self.unsafe_mode.as_deref() == Some("true")
    }
}

impl Task {
    /// Creates a not-yet-done task with a fresh id and both timestamps set to now.
    /// Callers pass fields that are already sanitized.
    pub fn new(title: String, description: String, due_date: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_task_id(),
            title,
            description,
            due_date: normalize_due_date(due_date),
            done: false,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn generate_task_id() -> String {
    format!("{}{}", TASK_ID_PREFIX, Uuid::new_v4())
}

/// An empty due date means "no due date".
pub fn normalize_due_date(due_date: Option<String>) -> Option<String> {
    due_date.filter(|value| !value.is_empty())
}
