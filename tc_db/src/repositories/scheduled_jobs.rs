//! ABOUTME: Persistent job store backing the Scheduler's reconcile algorithm
//! ABOUTME: Stable job ids follow the `task_{task_id}` convention the Scheduler owns exclusively

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};
use tc_core::{time::now_iso8601, Error, Result};

/// A durable trigger row. `job_id` is always `task_{task_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledJob {
    pub job_id: String,
    pub task_id: i64,
    pub cron_expression: String,
    pub next_run_at: Option<String>,
    pub kwargs: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertScheduledJobRequest {
    pub task_id: i64,
    pub cron_expression: String,
    pub next_run_at: Option<String>,
    pub kwargs: Option<String>,
}

pub fn job_id_for(task_id: i64) -> String {
    format!("task_{task_id}")
}

pub async fn upsert<'e, E>(exec: E, request: UpsertScheduledJobRequest) -> Result<ScheduledJob>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let job_id = job_id_for(request.task_id);
    let now = now_iso8601();

    sqlx::query_as::<_, ScheduledJob>(
        r#"
        INSERT INTO scheduled_jobs (job_id, task_id, cron_expression, next_run_at, kwargs, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (job_id) DO UPDATE SET
            cron_expression = excluded.cron_expression,
            next_run_at = excluded.next_run_at,
            kwargs = excluded.kwargs,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(&job_id)
    .bind(request.task_id)
    .bind(&request.cron_expression)
    .bind(&request.next_run_at)
    .bind(&request.kwargs)
    .bind(&now)
    .bind(&now)
    .fetch_one(exec)
    .await
    .map_err(|e| Error::Database(format!("failed to upsert scheduled job for task {}: {e}", request.task_id)))
}

pub async fn find_by_task_id<'e, E>(exec: E, task_id: i64) -> Result<Option<ScheduledJob>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ScheduledJob>("SELECT * FROM scheduled_jobs WHERE task_id = ?")
        .bind(task_id)
        .fetch_optional(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to find scheduled job for task {task_id}: {e}")))
}

pub async fn list<'e, E>(exec: E) -> Result<Vec<ScheduledJob>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, ScheduledJob>("SELECT * FROM scheduled_jobs ORDER BY task_id")
        .fetch_all(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to list scheduled jobs: {e}")))
}

pub async fn remove_by_task_id<'e, E>(exec: E, task_id: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM scheduled_jobs WHERE task_id = ?")
        .bind(task_id)
        .execute(exec)
        .await
        .map_err(|e| Error::Database(format!("failed to remove scheduled job for task {task_id}: {e}")))?;
    Ok(())
}

pub struct ScheduledJobsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ScheduledJobsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, request: UpsertScheduledJobRequest) -> Result<ScheduledJob> {
        upsert(self.pool, request).await
    }

    pub async fn find_by_task_id(&self, task_id: i64) -> Result<Option<ScheduledJob>> {
        find_by_task_id(self.pool, task_id).await
    }

    pub async fn list(&self) -> Result<Vec<ScheduledJob>> {
        list(self.pool).await
    }

    pub async fn remove_by_task_id(&self, task_id: i64) -> Result<()> {
        remove_by_task_id(self.pool, task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_on_job_id() {
        let pool = test_support::create_test_pool().await;
        let repo = ScheduledJobsRepository::new(&pool);

        repo.upsert(UpsertScheduledJobRequest {
            task_id: 42,
            cron_expression: "0 * * * *".into(),
            next_run_at: None,
            kwargs: None,
        })
        .await
        .unwrap();

        let updated = repo
            .upsert(UpsertScheduledJobRequest {
                task_id: 42,
                cron_expression: "*/5 * * * *".into(),
                next_run_at: None,
                kwargs: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.job_id, "task_42");
        assert_eq!(updated.cron_expression, "*/5 * * * *");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let pool = test_support::create_test_pool().await;
        let repo = ScheduledJobsRepository::new(&pool);

        repo.remove_by_task_id(7).await.unwrap();
        assert!(repo.find_by_task_id(7).await.unwrap().is_none());
    }
}
