use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RepositoryError, TaskRepository};
use crate::models::Task;

/// Process-local task store selected with `DB_DRIVER=memory`.
///
/// Rows are kept in insertion order; `list` re-sorts newest first.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<Vec<Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching(&self, needle: &str) -> Vec<Task> {
        let needle = needle.to_lowercase();
        let mut found: Vec<Task> = self
            .tasks
            .read()
            .await
            .iter()
            .rev()
            .filter(|task| task.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<(), RepositoryError> {
        self.tasks.write().await.push(task.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Task>, RepositoryError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.iter().rev().cloned().collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .iter_mut()
            .find(|stored| stored.id == task.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.due_date = task.due_date.clone();
        stored.done = task.done;
        stored.updated_at = task.updated_at;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn search_by_title(&self, needle: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.matching(needle).await)
    }

    // There is no statement to inject into here; the raw needle is matched unescaped.
    async fn search_by_title_unsafe(&self, raw: &str) -> Result<Vec<Task>, RepositoryError> {
        Ok(self.matching(raw).await)
    }
}
