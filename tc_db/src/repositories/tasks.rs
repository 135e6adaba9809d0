//! ABOUTME: Task repository: validated CRUD plus the domain queries the Scheduler and Executor need
//! ABOUTME: Cross-field validation (is_auto requires a parseable cron expression) lives here

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};
use std::str::FromStr;
use tc_core::{time::now_iso8601, Error, Result};

/// A configured, schedulable crawling intent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRecord {
    pub id: i64,
    pub task_name: String,
    pub crawler_id: i64,
    pub task_args: String,
    pub is_auto: bool,
    pub is_scheduled: bool,
    pub cron_expression: Option<String>,
    pub is_active: bool,
    pub max_retries: i64,
    pub retry_count: i64,
    pub scrape_mode: String,
    pub task_status: String,
    pub scrape_phase: String,
    pub last_run_at: Option<String>,
    pub last_run_success: Option<bool>,
    pub last_run_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub task_name: String,
    pub crawler_id: i64,
    pub task_args: Option<String>,
    pub is_auto: bool,
    pub cron_expression: Option<String>,
    pub is_active: Option<bool>,
    pub max_retries: Option<i64>,
    pub scrape_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub task_name: Option<String>,
    pub task_args: Option<String>,
    pub is_auto: Option<bool>,
    pub cron_expression: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub max_retries: Option<i64>,
    pub scrape_mode: Option<String>,
    pub task_status: Option<String>,
    pub scrape_phase: Option<String>,
    pub is_scheduled: Option<bool>,
    pub last_run_at: Option<String>,
    pub last_run_success: Option<bool>,
    pub last_run_message: Option<String>,
}

/// Validates a five-field cron expression. Shared by create/update; `is_auto ⇒ cron_expression`
/// is the one cross-field rule this repository enforces (per the orchestration core's invariant 1).
fn validate_cron_expression(expr: &str) -> Result<()> {
    cron::Schedule::from_str(expr)
        .map(|_| ())
        .map_err(|e| Error::Validation(format!("invalid cron expression '{expr}': {e}")))
}

fn validate_create(request: &CreateTaskRequest) -> Result<()> {
    if request.task_name.trim().is_empty() {
        return Err(Error::Validation("task_name must not be empty".into()));
    }
    if request.is_auto {
        match &request.cron_expression {
            Some(expr) if !expr.trim().is_empty() => validate_cron_expression(expr)?,
            _ => {
                return Err(Error::Validation(
                    "cron_expression is required when is_auto is true".into(),
                ))
            }
        }
    }
    Ok(())
}

/// `is_auto_after_update` reflects only what *this* request explicitly sets. When it's true,
/// `cron_expression` must be supplied in the very same request — unlike `create`, an update
/// can't fall back to "whatever's already stored" because validating that would mean re-reading
/// the row mid-update, and every other field here is judged solely from `request`. A caller
/// flipping `is_auto` to true on a task that already has a cron expression on file still has to
/// name it again in the same call.
fn validate_update(request: &UpdateTaskRequest, is_auto_after_update: bool) -> Result<()> {
    if let Some(name) = &request.task_name {
        if name.trim().is_empty() {
            return Err(Error::Validation("task_name must not be empty".into()));
        }
    }
    if let Some(Some(expr)) = &request.cron_expression {
        if !expr.trim().is_empty() {
            validate_cron_expression(expr)?;
        }
    }
    if is_auto_after_update {
        let has_cron = request
            .cron_expression
            .as_ref()
            .and_then(|inner| inner.as_deref())
            .is_some_and(|e| !e.trim().is_empty());
        if !has_cron {
            return Err(Error::Validation(
                "cron_expression is required in the same update when setting is_auto to true".into(),
            ));
        }
    }
    Ok(())
}

pub async fn create<'e, E>(exec: E, request: CreateTaskRequest) -> Result<TaskRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    validate_create(&request)?;
    let now = now_iso8601();

    sqlx::query_as::<_, TaskRecord>(
        r#"
        INSERT INTO tasks (
            task_name, crawler_id, task_args, is_auto, is_scheduled, cron_expression,
            is_active, max_retries, retry_count, scrape_mode, task_status, scrape_phase,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, 0, ?, 'INIT', 'INIT', ?, ?)
        RETURNING *
        "#,
    )
    .bind(&request.task_name)
    .bind(request.crawler_id)
    .bind(request.task_args.unwrap_or_else(|| "{}".to_string()))
    .bind(request.is_auto)
    .bind(&request.cron_expression)
    .bind(request.is_active.unwrap_or(true))
    .bind(request.max_retries.unwrap_or(0))
    .bind(request.scrape_mode.unwrap_or_else(|| "FULL_SCRAPE".to_string()))
    .bind(&now)
    .bind(&now)
    .fetch_one(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to create task: {e}")))
}

pub async fn find_by_id<'e, E>(exec: E, id: i64) -> Result<Option<TaskRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskRecord>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find task {id}: {e}")))
}

pub async fn list<'e, E>(exec: E) -> Result<Vec<TaskRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskRecord>("SELECT * FROM tasks ORDER BY id")
        .fetch_all(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to list tasks: {e}")))
}

/// `A` in the reconcile algorithm: auto, active tasks eligible for persistent scheduling.
/// This filter is the single source of truth for dispatch eligibility everywhere in the system.
pub async fn find_auto_tasks<'e, E>(exec: E) -> Result<Vec<TaskRecord>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, TaskRecord>(
        "SELECT * FROM tasks WHERE is_auto = 1 AND is_active = 1 ORDER BY id",
    )
    .fetch_all(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to find auto tasks: {e}")))
}

pub async fn delete<'e, E>(exec: E, id: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to delete task {id}: {e}")))?;
    Ok(())
}

pub async fn toggle_scheduled_status<'e, E>(exec: E, id: i64, is_scheduled: bool) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = now_iso8601();
    sqlx::query("UPDATE tasks SET is_scheduled = ?, updated_at = ? WHERE id = ?")
        .bind(is_scheduled)
        .bind(&now)
        .bind(id)
        .execute(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to toggle is_scheduled for task {id}: {e}")))?;
    Ok(())
}

pub async fn update<'e, E>(exec: E, id: i64, request: UpdateTaskRequest) -> Result<TaskRecord>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let is_auto_after = request.is_auto.unwrap_or(false);
    validate_update(&request, is_auto_after)?;

    let mut set_clauses: Vec<&str> = Vec::new();
    let mut query = String::from("UPDATE tasks SET ");

    macro_rules! push_clause {
        ($name:expr) => {
            set_clauses.push(concat!($name, " = ?"));
        };
    }

    if request.task_name.is_some() {
        push_clause!("task_name");
    }
    if request.task_args.is_some() {
        push_clause!("task_args");
    }
    if request.is_auto.is_some() {
        push_clause!("is_auto");
    }
    if request.cron_expression.is_some() {
        push_clause!("cron_expression");
    }
    if request.is_active.is_some() {
        push_clause!("is_active");
    }
    if request.max_retries.is_some() {
        push_clause!("max_retries");
    }
    if request.scrape_mode.is_some() {
        push_clause!("scrape_mode");
    }
    if request.task_status.is_some() {
        push_clause!("task_status");
    }
    if request.scrape_phase.is_some() {
        push_clause!("scrape_phase");
    }
    if request.is_scheduled.is_some() {
        push_clause!("is_scheduled");
    }
    if request.last_run_at.is_some() {
        push_clause!("last_run_at");
    }
    if request.last_run_success.is_some() {
        push_clause!("last_run_success");
    }
    if request.last_run_message.is_some() {
        push_clause!("last_run_message");
    }

    if set_clauses.is_empty() {
        return find_by_id(exec, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {id} not found")));
    }

    set_clauses.push("updated_at = ?");
    query.push_str(&set_clauses.join(", "));
    query.push_str(" WHERE id = ? RETURNING *");

    let mut q = sqlx::query_as::<_, TaskRecord>(&query);
    if let Some(v) = request.task_name {
        q = q.bind(v);
    }
    if let Some(v) = request.task_args {
        q = q.bind(v);
    }
    if let Some(v) = request.is_auto {
        q = q.bind(v);
    }
    if let Some(v) = request.cron_expression {
        q = q.bind(v);
    }
    if let Some(v) = request.is_active {
        q = q.bind(v);
    }
    if let Some(v) = request.max_retries {
        q = q.bind(v);
    }
    if let Some(v) = request.scrape_mode {
        q = q.bind(v);
    }
    if let Some(v) = request.task_status {
        q = q.bind(v);
    }
    if let Some(v) = request.scrape_phase {
        q = q.bind(v);
    }
    if let Some(v) = request.is_scheduled {
        q = q.bind(v);
    }
    if let Some(v) = request.last_run_at {
        q = q.bind(v);
    }
    if let Some(v) = request.last_run_success {
        q = q.bind(v);
    }
    if let Some(v) = request.last_run_message {
        q = q.bind(v);
    }
    q = q.bind(now_iso8601());
    q = q.bind(id);

    q.fetch_one(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to update task {id}: {e}")))
}

/// Convenience wrapper bound to a single pool, for call sites that don't need an explicit
/// transaction scope (most reads, and single-statement writes).
pub struct TaskRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TaskRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: CreateTaskRequest) -> Result<TaskRecord> {
        create(self.pool, request).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TaskRecord>> {
        find_by_id(self.pool, id).await
    }

    pub async fn list(&self) -> Result<Vec<TaskRecord>> {
        list(self.pool).await
    }

    pub async fn find_auto_tasks(&self) -> Result<Vec<TaskRecord>> {
        find_auto_tasks(self.pool).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        delete(self.pool, id).await
    }

    pub async fn toggle_scheduled_status(&self, id: i64, is_scheduled: bool) -> Result<()> {
        toggle_scheduled_status(self.pool, id, is_scheduled).await
    }

    pub async fn update(&self, id: i64, request: UpdateTaskRequest) -> Result<TaskRecord> {
        update(self.pool, id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        test_support::create_test_pool().await
    }

    async fn seed_crawler(pool: &SqlitePool) -> i64 {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO crawlers (crawler_name, crawler_type, module_name, base_url, config_file_name, is_active, created_at, updated_at)
             VALUES ('c1', 'web', 'web_crawler', 'https://example.com', 'c1.json', 1, ?, ?) RETURNING id",
        )
        .bind(now_iso8601())
        .bind(now_iso8601())
        .fetch_one(pool)
        .await
        .unwrap();
        row.0
    }

    #[tokio::test]
    async fn create_requires_cron_when_auto() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;

        let result = create(
            &pool,
            CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: None,
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_invalid_cron() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;

        let result = create(
            &pool,
            CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: Some("not a cron".into()),
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            },
        )
        .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn find_auto_tasks_excludes_inactive() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;

        let repo = TaskRepository::new(&pool);
        repo.create(CreateTaskRequest {
            task_name: "active-auto".into(),
            crawler_id,
            task_args: None,
            is_auto: true,
            cron_expression: Some("*/5 * * * *".into()),
            is_active: Some(true),
            max_retries: None,
            scrape_mode: None,
        })
        .await
        .unwrap();

        let inactive = repo
            .create(CreateTaskRequest {
                task_name: "inactive-auto".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: Some("*/5 * * * *".into()),
                is_active: Some(false),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();

        let auto_tasks = repo.find_auto_tasks().await.unwrap();
        assert!(auto_tasks.iter().any(|t| t.task_name == "active-auto"));
        assert!(!auto_tasks.iter().any(|t| t.id == inactive.id));
    }

    #[tokio::test]
    async fn update_rejects_is_auto_true_without_cron_in_the_same_request() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;
        let repo = TaskRepository::new(&pool);

        let created = repo
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: false,
                cron_expression: None,
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();

        let result = repo
            .update(
                created.id,
                UpdateTaskRequest { is_auto: Some(true), ..Default::default() },
            )
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let unchanged = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert!(!unchanged.is_auto);
    }

    #[tokio::test]
    async fn update_allows_is_auto_true_when_cron_is_supplied_in_the_same_request() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;
        let repo = TaskRepository::new(&pool);

        let created = repo
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: false,
                cron_expression: None,
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                UpdateTaskRequest {
                    is_auto: Some(true),
                    cron_expression: Some(Some("*/5 * * * *".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.is_auto);
        assert_eq!(updated.cron_expression, Some("*/5 * * * *".into()));
    }

    #[tokio::test]
    async fn update_applies_only_provided_fields() {
        let pool = pool().await;
        let crawler_id = seed_crawler(&pool).await;
        let repo = TaskRepository::new(&pool);

        let created = repo
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: false,
                cron_expression: None,
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                UpdateTaskRequest {
                    task_status: Some("RUNNING".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.task_status, "RUNNING");
        assert_eq!(updated.task_name, "T1");
    }
}
