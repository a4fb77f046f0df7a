//! Storage boundary for tasks.
//!
//! `TaskRepository` is the narrow CRUD interface the service layer talks to.
//! `PostgresTaskRepository` is the production adapter; `InMemoryTaskRepository`
//! backs `DB_DRIVER=memory` and the test suites.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;

use crate::models::Task;

pub use memory::InMemoryTaskRepository;
pub use postgres::PostgresTaskRepository;

/// Failure of a repository call.
#[derive(Debug)]
pub enum RepositoryError {
    /// An update or delete matched no row.
    NotFound,
    /// Any other storage failure.
    Database(sqlx::Error),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "no task matches the given id"),
            RepositoryError::Database(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        RepositoryError::Database(error)
    }
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> Result<(), RepositoryError>;

    /// `Ok(None)` when no row has this id.
    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Task>, RepositoryError>;

    /// Overwrites every mutable column of the row identified by `task.id`.
    async fn update(&self, task: &Task) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    /// Case-insensitive substring match on the title, with the needle bound as a parameter.
    async fn search_by_title(&self, needle: &str) -> Result<Vec<Task>, RepositoryError>;

    /// Same match as `search_by_title`, but `raw` is pasted verbatim into the
    /// statement text. Deliberately injectable; only reachable through
    /// `TaskService::search_by_title_unsafe`.
    async fn search_by_title_unsafe(&self, raw: &str) -> Result<Vec<Task>, RepositoryError>;
}
