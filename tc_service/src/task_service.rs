// ABOUTME: Validated task CRUD plus the crawler join / history queries the web layer needs
// ABOUTME: Every write that touches more than one table runs inside one service-driven transaction

use serde::{Deserialize, Serialize};
use tc_core::{time::now_iso8601, Error, Result};
use tc_db::repositories::{crawlers, task_history, tasks};
use tc_db::{
    CreateTaskRequest, Db, TaskHistoryRecord, TaskRecord, UpdateTaskRequest,
};
use tracing::instrument;

/// A task alongside the crawler it targets, the shape the API's "get task" response wants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithCrawler {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub crawler_name: String,
    pub module_name: String,
}

/// A single execution attempt, renamed from the bare repository row for the API surface.
pub type TaskHistoryView = TaskHistoryRecord;

pub struct TaskService {
    db: Db,
}

impl TaskService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates a task after confirming its `crawler_id` actually exists — the one cross-table
    /// check the repository layer can't make on its own since it only sees one table at a time.
    #[instrument(skip(self, request))]
    pub async fn create_task(&self, request: CreateTaskRequest) -> Result<TaskRecord> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        let crawler = crawlers::find_by_id(&mut *tx, request.crawler_id).await?;
        if crawler.is_none() {
            return Err(Error::NotFound(format!(
                "crawler {} not found",
                request.crawler_id
            )));
        }

        let created = tasks::create(&mut *tx, request).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update_task(&self, task_id: i64, request: UpdateTaskRequest) -> Result<TaskRecord> {
        tasks::update(self.db.pool(), task_id, request).await
    }

    /// Removing a task also drops any history rows and persistent scheduler jobs pointing at
    /// it, so the delete runs as one transaction rather than three independent statements.
    #[instrument(skip(self))]
    pub async fn delete_task(&self, task_id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        tasks::find_by_id(&mut *tx, task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;

        sqlx::query("DELETE FROM task_history WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM scheduled_jobs WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tasks::delete(&mut *tx, task_id).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    pub async fn get_task(&self, task_id: i64) -> Result<TaskWithCrawler> {
        let task = tasks::find_by_id(self.db.pool(), task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;
        self.with_crawler(task).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskWithCrawler>> {
        let tasks = tasks::list(self.db.pool()).await?;
        let mut out = Vec::with_capacity(tasks.len());
        for task in tasks {
            out.push(self.with_crawler(task).await?);
        }
        Ok(out)
    }

    async fn with_crawler(&self, task: TaskRecord) -> Result<TaskWithCrawler> {
        let crawler = crawlers::find_by_id(self.db.pool(), task.crawler_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("crawler {} not found", task.crawler_id)))?;
        Ok(TaskWithCrawler {
            crawler_name: crawler.crawler_name,
            module_name: crawler.module_name,
            task,
        })
    }

    pub async fn get_task_history(&self, task_id: i64) -> Result<Vec<TaskHistoryView>> {
        task_history::list_for_task(self.db.pool(), task_id).await
    }

    /// `last_run_at` is stamped here rather than left to the executor, so every update to a
    /// task's scheduling flags goes through this one audited path.
    #[instrument(skip(self))]
    pub async fn toggle_scheduled(&self, task_id: i64, is_scheduled: bool) -> Result<()> {
        tasks::toggle_scheduled_status(self.db.pool(), task_id, is_scheduled).await
    }

    pub async fn touch_updated_at(&self, task_id: i64) -> Result<TaskRecord> {
        tasks::update(
            self.db.pool(),
            task_id,
            UpdateTaskRequest {
                last_run_at: Some(now_iso8601()),
                ..Default::default()
            },
        )
        .await
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}
