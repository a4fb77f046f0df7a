//! Business rules for tasks: input validation, HTML escaping, id and
//! timestamp assignment, and fetch-merge-write updates.

use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{task::normalize_due_date, CreateTaskInput, Task, UpdateTaskInput},
    repository::TaskRepository,
    security::sanitize_input,
};

pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateTaskInput) -> Result<Task, AppError> {
        input.validate()?;

        let task = Task::new(
            sanitize_input(&input.title),
            sanitize_input(&input.description),
            input.due_date,
        );
        self.repo.create(&task).await?;
        Ok(task)
    }

    pub async fn get(&self, id: &str) -> Result<Task, AppError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("task not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.repo.list().await?)
    }

    /// Applies the supplied fields on top of the stored task. `due_date` is
    /// kept verbatim; an empty string clears it.
    pub async fn update(&self, id: &str, patch: UpdateTaskInput) -> Result<Task, AppError> {
        patch.validate()?;

        let mut task = self.get(id).await?;
        if let Some(title) = patch.title {
            task.title = sanitize_input(&title);
        }
        if let Some(description) = patch.description {
            task.description = sanitize_input(&description);
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = normalize_due_date(Some(due_date));
        }
        if let Some(done) = patch.done {
            task.done = done;
        }
        task.updated_at = Utc::now();

        self.repo.update(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        Ok(self.repo.delete(id).await?)
    }

    /// Escapes the query the same way titles are escaped on write, then runs a
    /// parameterized match.
    pub async fn search_by_title(&self, query: &str) -> Result<Vec<Task>, AppError> {
        Ok(self.repo.search_by_title(&sanitize_input(query)).await?)
    }

    /// Injectable search for security training. The query is passed through
    /// untouched.
    pub async fn search_by_title_unsafe(&self, raw_query: &str) -> Result<Vec<Task>, AppError> {
        log::warn!(query = raw_query; "running injectable title search");
        Ok(self.repo.search_by_title_unsafe(raw_query).await?)
    }
}
