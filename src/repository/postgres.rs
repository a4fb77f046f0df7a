use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool};

use super::{RepositoryError, TaskRepository};
use crate::models::Task;

const SCHEMA: &str = include_str!("../../migrations/0001_create_tasks.sql");

const TASK_COLUMNS: &str = "id, title, description, due_date, done, created_at, updated_at";

/// Postgres adapter over a single `tasks` table.
#[derive(Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool, checks connectivity and makes sure the table exists.
    pub async fn connect(options: PgConnectOptions) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;
        let repository = Self::new(pool);
        repository.ensure_schema().await?;
        Ok(repository)
    }

    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        self.pool.execute(SCHEMA).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Builds the statement used by the injectable search. Kept separate so the
/// vulnerable text can be inspected without a database.
pub fn unsafe_search_statement(raw: &str) -> String {
    format!(
        "SELECT {} FROM tasks WHERE title ILIKE '%{}%' ORDER BY created_at DESC",
        TASK_COLUMNS, raw
    )
}

/// Wraps the needle for a parameterized `ILIKE`.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle)
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create(&self, task: &Task) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tasks (id, title, description, due_date, done, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.due_date)
        .bind(task.done)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, RepositoryError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, RepositoryError> {
        let sql = format!("SELECT {} FROM tasks ORDER BY created_at DESC", TASK_COLUMNS);
        let tasks = sqlx::query_as::<_, Task>(&sql).fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE tasks
             SET title = $1, description = $2, due_date = $3, done = $4, updated_at = $5
             WHERE id = $6",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(&task.due_date)
        .bind(task.done)
        .bind(task.updated_at)
        .bind(&task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn search_by_title(&self, needle: &str) -> Result<Vec<Task>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE title ILIKE $1 ORDER BY created_at DESC",
            TASK_COLUMNS
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(contains_pattern(needle))
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn search_by_title_unsafe(&self, raw: &str) -> Result<Vec<Task>, RepositoryError> {
        // SQL injection on purpose: `raw` is never escaped or bound.
        let sql = unsafe_search_statement(raw);
        let tasks = sqlx::query_as::<_, Task>(&sql).fetch_all(&self.pool).await?;
        Ok(tasks)
    }
}
