//! ABOUTME: Task history repository: one append-mostly row per execution attempt
//! ABOUTME: Only the running row is ever mutated; terminal rows are immutable after finalize

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tc_core::{time::now_iso8601, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskHistoryRecord {
    pub id: i64,
    pub task_id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub task_status: String,
    pub message: Option<String>,
    pub articles_count: Option<i64>,
    pub success: Option<bool>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskHistoryRequest {
    pub task_id: i64,
    pub start_time: String,
    pub task_status: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskHistoryRequest {
    pub end_time: Option<String>,
    pub task_status: Option<String>,
    pub message: Option<String>,
    pub articles_count: Option<i64>,
    pub success: Option<bool>,
}

pub async fn create<'e, E>(exec: E, request: CreateTaskHistoryRequest) -> Result<TaskHistoryRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    if request.task_status.trim().is_empty() {
        return Err(Error::Validation("task_status must not be empty".into()));
    }
    let now = now_iso8601();

    sqlx::query_as::<_, TaskHistoryRecord>(
        r#"
        INSERT INTO task_history (task_id, start_time, task_status, message, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(request.task_id)
    .bind(&request.start_time)
    .bind(&request.task_status)
    .bind(&request.message)
    .bind(&now)
    .fetch_one(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to create task history row: {e}")))
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> Result<Option<TaskHistoryRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskHistoryRecord>("SELECT * FROM task_history WHERE id = ?")
        .bind(id)
        .fetch_optional(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find task history row {id}: {e}")))
}

/// The row with `task_status = RUNNING ∧ end_time = ∅`, at most one per task (invariant 3).
pub async fn find_running<'e, E>(exec: E, task_id: i64) -> Result<Option<TaskHistoryRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskHistoryRecord>(
        "SELECT * FROM task_history WHERE task_id = ? AND task_status = 'RUNNING' AND end_time IS NULL
         ORDER BY id DESC LIMIT 1",
    )
    .bind(task_id)
    .fetch_optional(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to find running history row for task {task_id}: {e}")))
}

pub async fn get_latest<'e, E>(exec: E, task_id: i64) -> Result<Option<TaskHistoryRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskHistoryRecord>(
        "SELECT * FROM task_history WHERE task_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(task_id)
    .fetch_optional(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to get latest history for task {task_id}: {e}")))
}

pub async fn list_for_task<'e, E>(exec: E, task_id: i64) -> Result<Vec<TaskHistoryRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskHistoryRecord>(
        "SELECT * FROM task_history WHERE task_id = ? ORDER BY id DESC",
    )
    .bind(task_id)
    .fetch_all(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to list history for task {task_id}: {e}")))
}

/// Terminal-only update: sets `end_time`/`task_status`/`message`/`articles_count`/`success`
/// in the same transaction the caller uses to update the Task mirror fields (invariant 4).
pub async fn update<'e, E>(exec: E, id: i64, request: UpdateTaskHistoryRequest) -> Result<TaskHistoryRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let mut set_clauses: Vec<&str> = Vec::new();
    let mut query = String::from("UPDATE task_history SET ");

    if request.end_time.is_some() {
        set_clauses.push("end_time = ?");
    }
    if request.task_status.is_some() {
        set_clauses.push("task_status = ?");
    }
    if request.message.is_some() {
        set_clauses.push("message = ?");
    }
    if request.articles_count.is_some() {
        set_clauses.push("articles_count = ?");
    }
    if request.success.is_some() {
        set_clauses.push("success = ?");
    }

    if set_clauses.is_empty() {
        return find_by_id(exec, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task history row {id} not found")));
    }

    query.push_str(&set_clauses.join(", "));
    query.push_str(" WHERE id = ? RETURNING *");

    let mut q = sqlx::query_as::<_, TaskHistoryRecord>(&query);
    if let Some(v) = request.end_time {
        q = q.bind(v);
    }
    if let Some(v) = request.task_status {
        q = q.bind(v);
    }
    if let Some(v) = request.message {
        q = q.bind(v);
    }
    if let Some(v) = request.articles_count {
        q = q.bind(v);
    }
    if let Some(v) = request.success {
        q = q.bind(v);
    }
    q = q.bind(id);

    q.fetch_one(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to update task history row {id}: {e}")))
}

pub struct TaskHistoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TaskHistoryRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: CreateTaskHistoryRequest) -> Result<TaskHistoryRecord> {
        create(self.pool, request).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TaskHistoryRecord>> {
        find_by_id(self.pool, id).await
    }

    pub async fn find_running(&self, task_id: i64) -> Result<Option<TaskHistoryRecord>> {
        find_running(self.pool, task_id).await
    }

    pub async fn get_latest(&self, task_id: i64) -> Result<Option<TaskHistoryRecord>> {
        get_latest(self.pool, task_id).await
    }

    pub async fn list_for_task(&self, task_id: i64) -> Result<Vec<TaskHistoryRecord>> {
        list_for_task(self.pool, task_id).await
    }

    pub async fn update(&self, id: i64, request: UpdateTaskHistoryRequest) -> Result<TaskHistoryRecord> {
        update(self.pool, id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_task(pool: &SqlitePool) -> i64 {
        let crawler: (i64,) = sqlx::query_as(
            "INSERT INTO crawlers (crawler_name, crawler_type, module_name, base_url, config_file_name, is_active, created_at, updated_at)
             VALUES ('c1', 'web', 'web_crawler', 'https://example.com', 'c1.json', 1, ?, ?) RETURNING id",
        )
        .bind(now_iso8601())
        .bind(now_iso8601())
        .fetch_one(pool)
        .await
        .unwrap();

        let task: (i64,) = sqlx::query_as(
            "INSERT INTO tasks (task_name, crawler_id, task_args, is_auto, is_scheduled, is_active, max_retries, retry_count, scrape_mode, task_status, scrape_phase, created_at, updated_at)
             VALUES ('T1', ?, '{}', 0, 0, 1, 0, 0, 'FULL_SCRAPE', 'INIT', 'INIT', ?, ?) RETURNING id",
        )
        .bind(crawler.0)
        .bind(now_iso8601())
        .bind(now_iso8601())
        .fetch_one(pool)
        .await
        .unwrap();
        task.0
    }

    #[tokio::test]
    async fn at_most_one_running_row_is_found() {
        let pool = test_support::create_test_pool().await;
        let task_id = seed_task(&pool).await;
        let repo = TaskHistoryRepository::new(&pool);

        let row = repo
            .create(CreateTaskHistoryRequest {
                task_id,
                start_time: now_iso8601(),
                task_status: "RUNNING".into(),
                message: Some("task starting".into()),
            })
            .await
            .unwrap();

        let found = repo.find_running(task_id).await.unwrap().unwrap();
        assert_eq!(found.id, row.id);

        repo.update(
            row.id,
            UpdateTaskHistoryRequest {
                end_time: Some(now_iso8601()),
                task_status: Some("COMPLETED".into()),
                articles_count: Some(3),
                success: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(repo.find_running(task_id).await.unwrap().is_none());
    }
}
