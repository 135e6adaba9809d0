//! ABOUTME: Cron-driven persistent scheduler bridging the task catalog and the Executor
//! ABOUTME: Owns the scheduled_jobs table exclusively; dispatch is fire-and-forget

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tc_core::{Error, Result, TaskDispatcher};
use tc_db::{Db, UpsertScheduledJobRequest};
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job as CronJob, JobScheduler as TokioCronScheduler};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Computes the next fire time for a cron expression as an RFC3339 string, for the
/// `next_run_at` introspection column. Kept separate from `tokio-cron-scheduler`'s own internal
/// clock since that engine doesn't expose upcoming-fire times for a job it hasn't registered yet.
fn compute_next_run_at(cron_expr: &str) -> Result<String> {
    let schedule = cron::Schedule::from_str(cron_expr)
        .map_err(|e| Error::Scheduler(format!("invalid cron expression '{cron_expr}': {e}")))?;
    let next = schedule
        .upcoming(chrono::Utc)
        .next()
        .ok_or_else(|| Error::Scheduler(format!("cron expression '{cron_expr}' has no upcoming run")))?;
    Ok(next.to_rfc3339())
}

/// Re-upserts a persisted job's `next_run_at` after it fires or is caught up, leaving
/// `cron_expression`/`kwargs` untouched. A free function (rather than a method) because the
/// cron trigger's fire closure only has `db` in scope, not `&TaskScheduler`.
async fn persist_next_run_at(db: &Db, task_id: i64, cron_expr: &str, kwargs: Option<String>) -> Result<()> {
    let next_run_at = Some(compute_next_run_at(cron_expr)?);
    db.scheduled_jobs()
        .upsert(UpsertScheduledJobRequest {
            task_id,
            cron_expression: cron_expr.to_string(),
            next_run_at,
            kwargs,
        })
        .await?;
    Ok(())
}

/// `reload_interval_hr` and `misfire_grace_secs` live in `tc_config::SchedulerConfig`; this
/// scheduler only needs the two knobs, so it takes them directly rather than the whole config.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub reload_interval_hr: u32,
    pub misfire_grace_secs: u64,
}

impl From<&tc_config::SchedulerConfig> for SchedulerSettings {
    fn from(cfg: &tc_config::SchedulerConfig) -> Self {
        Self {
            reload_interval_hr: cfg.reload_interval_hr,
            misfire_grace_secs: cfg.misfire_grace_secs,
        }
    }
}

/// Outcome of a reconcile pass, for logging and for the testable-properties suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    pub added: Vec<i64>,
    pub replaced: Vec<i64>,
    pub removed: Vec<i64>,
    pub failed: Vec<i64>,
}

impl ReconcileReport {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.replaced.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub persisted_job_count: usize,
    pub active_trigger_count: usize,
    pub last_start_time: Option<String>,
    pub last_shutdown_time: Option<String>,
}

/// One row of `PersistedJobs()` introspection: a persisted trigger cross-referenced against
/// whatever the task table currently says about the task it names.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PersistedJobView {
    pub job_id: String,
    pub task_id: i64,
    pub cron_expression: String,
    pub next_run_at: Option<String>,
    pub task_exists: bool,
    pub task_is_auto: Option<bool>,
    pub task_is_active: Option<bool>,
}

/// Maintains `{tasks where is_auto=true ∧ is_active=true} ⇔ {persistent jobs}` and dispatches a
/// task id to the Executor whenever a trigger fires. The only component allowed to mutate the
/// `scheduled_jobs` table.
pub struct TaskScheduler {
    db: Db,
    dispatcher: Arc<dyn TaskDispatcher>,
    cron: Mutex<TokioCronScheduler>,
    triggers: RwLock<HashMap<i64, Uuid>>,
    running: AtomicBool,
    settings: SchedulerSettings,
    last_start_time: RwLock<Option<String>>,
    last_shutdown_time: RwLock<Option<String>>,
}

impl TaskScheduler {
    pub async fn new(db: Db, dispatcher: Arc<dyn TaskDispatcher>, settings: SchedulerSettings) -> Result<Self> {
        let cron = TokioCronScheduler::new()
            .await
            .map_err(|e| Error::Scheduler(format!("failed to create cron engine: {e}")))?;

        Ok(Self {
            db,
            dispatcher,
            cron: Mutex::new(cron),
            triggers: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            settings,
            last_start_time: RwLock::new(None),
            last_shutdown_time: RwLock::new(None),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> SchedulerStatus {
        let persisted = self.db.scheduled_jobs().list().await.unwrap_or_default();
        SchedulerStatus {
            running: self.is_running(),
            persisted_job_count: persisted.len(),
            active_trigger_count: self.triggers.read().await.len(),
            last_start_time: self.last_start_time.read().await.clone(),
            last_shutdown_time: self.last_shutdown_time.read().await.clone(),
        }
    }

    /// Introspection: persisted jobs cross-referenced against the task table's current state.
    pub async fn persisted_jobs(&self) -> Result<Vec<PersistedJobView>> {
        let jobs = self.db.scheduled_jobs().list().await?;
        let mut views = Vec::with_capacity(jobs.len());
        for job in jobs {
            let task = self.db.tasks().find_by_id(job.task_id).await?;
            views.push(PersistedJobView {
                job_id: job.job_id,
                task_id: job.task_id,
                cron_expression: job.cron_expression,
                next_run_at: job.next_run_at,
                task_exists: task.is_some(),
                task_is_auto: task.as_ref().map(|t| t.is_auto),
                task_is_active: task.as_ref().map(|t| t.is_active),
            });
        }
        Ok(views)
    }

    /// Reconciles persistent jobs against DB tasks, then begins firing triggers. Idempotent
    /// failure: a second call while running returns `AlreadyRunning` without side effects.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<ReconcileReport> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.running.store(true, Ordering::SeqCst);
            return Err(Error::AlreadyRunning("scheduler is already running".into()));
        }

        let report = match self.reconcile().await {
            Ok(report) => report,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if let Err(e) = self.catch_up_misfires().await {
            warn!(error = %e, "misfire catch-up failed, continuing startup");
        }

        let mut cron = self.cron.lock().await;
        cron.start()
            .await
            .map_err(|e| Error::Scheduler(format!("failed to start cron engine: {e}")))?;
        drop(cron);

        *self.last_start_time.write().await = Some(tc_core::time::now_iso8601());
        info!(?report, "scheduler started");
        Ok(report)
    }

    /// Runs once per `start()`, never per `reload()`: a missed fire only exists because the
    /// scheduler itself was down, and `reload()` can happen any number of times while running.
    /// A job's stored `next_run_at` already being in the past means at least one fire was
    /// missed; multiple misses collapse into a single catch-up dispatch (coalescing).
    async fn catch_up_misfires(&self) -> Result<()> {
        for job in self.db.scheduled_jobs().list().await? {
            let Some(next_run_at) = job.next_run_at.as_deref() else {
                continue;
            };

            let miss_age_secs = match tc_core::time::seconds_since(next_run_at) {
                Ok(secs) => secs,
                Err(e) => {
                    warn!(task_id = job.task_id, error = %e, "unparsable next_run_at, skipping misfire check");
                    continue;
                }
            };

            if miss_age_secs > 0 {
                if miss_age_secs as u64 <= self.settings.misfire_grace_secs {
                    info!(task_id = job.task_id, miss_age_secs, "misfire within grace window, firing once");
                    if let Err(e) = self.dispatcher.dispatch(job.task_id).await {
                        error!(task_id = job.task_id, error = %e, "misfire catch-up dispatch failed");
                    }
                } else {
                    warn!(task_id = job.task_id, miss_age_secs, "misfire outside grace window, dropping");
                }
            }

            if let Err(e) = persist_next_run_at(&self.db, job.task_id, &job.cron_expression, job.kwargs.clone()).await {
                warn!(task_id = job.task_id, error = %e, "failed to refresh next_run_at after misfire check");
            }
        }
        Ok(())
    }

    /// Pauses dispatch; persisted jobs and in-memory triggers are left intact.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            self.running.store(false, Ordering::SeqCst);
            return Err(Error::NotRunning("scheduler is not running".into()));
        }

        let mut cron = self.cron.lock().await;
        cron.shutdown()
            .await
            .map_err(|e| Error::Scheduler(format!("failed to stop cron engine: {e}")))?;
        drop(cron);

        *self.last_shutdown_time.write().await = Some(tc_core::time::now_iso8601());
        info!("scheduler stopped");
        Ok(())
    }

    /// Upserts the persistent job for one task; no-op removal if the task is gone or non-auto.
    #[instrument(skip(self))]
    pub async fn add_or_update(&self, task_id: i64) -> Result<()> {
        let task = self.db.tasks().find_by_id(task_id).await?;
        match task {
            Some(task) if task.is_auto && task.is_active => self.ensure_job(&task).await,
            _ => self.remove_job(task_id).await,
        }
    }

    /// Create-or-replace-or-confirm the persistent job + in-memory trigger for one auto task.
    async fn ensure_job(&self, task: &tc_db::TaskRecord) -> Result<()> {
        let cron_expr = task.cron_expression.clone().ok_or_else(|| {
            Error::Validation(format!("task {} is auto but has no cron_expression", task.id))
        })?;

        let existing = self.db.scheduled_jobs().find_by_task_id(task.id).await?;
        match &existing {
            None => self.create_job(task.id, &cron_expr).await,
            Some(job) if job.cron_expression != cron_expr => self.replace_job(task.id, &cron_expr).await,
            Some(_) => {
                if !task.is_scheduled {
                    self.db.tasks().toggle_scheduled_status(task.id, true).await?;
                }
                if !self.triggers.read().await.contains_key(&task.id) {
                    self.create_trigger_only(task.id, &cron_expr).await?;
                }
                Ok(())
            }
        }
    }

    /// Removes the persistent job for this task and clears `is_scheduled`. Idempotent.
    #[instrument(skip(self))]
    pub async fn remove(&self, task_id: i64) -> Result<()> {
        self.remove_job(task_id).await
    }

    /// Full reconcile loop: `Start` and `Reload` both call this.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<ReconcileReport> {
        self.reconcile().await
    }

    async fn reconcile(&self) -> Result<ReconcileReport> {
        let auto_tasks = self.db.tasks().find_auto_tasks().await?;
        let persisted = self.db.scheduled_jobs().list().await?;

        let eligible_ids: HashSet<i64> = auto_tasks.iter().map(|t| t.id).collect();
        let mut report = ReconcileReport::default();

        // Step 1: P \ A. Orphaned persistent jobs (task deleted, deactivated, or turned non-auto).
        for job in persisted.iter().filter(|j| !eligible_ids.contains(&j.task_id)) {
            match self.remove_job(job.task_id).await {
                Ok(()) => report.removed.push(job.task_id),
                Err(e) => {
                    warn!(task_id = job.task_id, error = %e, "failed to remove orphaned persistent job");
                    report.failed.push(job.task_id);
                }
            }
        }

        // Step 2: A. Create missing jobs, replace jobs whose cron expression drifted, otherwise
        // just make sure is_scheduled reflects reality. `ensure_job` does the actual work; this
        // loop only classifies the before/after for the report.
        for task in &auto_tasks {
            if task.cron_expression.is_none() {
                warn!(task_id = task.id, "auto task has no cron_expression, skipping");
                report.failed.push(task.id);
                continue;
            }

            let existing = match self.db.scheduled_jobs().find_by_task_id(task.id).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(task_id = task.id, error = %e, "reconcile: failed to read persisted job");
                    report.failed.push(task.id);
                    continue;
                }
            };

            match self.ensure_job(task).await {
                Ok(()) => match &existing {
                    None => report.added.push(task.id),
                    Some(job) if Some(&job.cron_expression) != task.cron_expression.as_ref() => {
                        report.replaced.push(task.id)
                    }
                    Some(_) => {}
                },
                Err(e) => {
                    warn!(task_id = task.id, error = %e, "reconcile: failed to schedule task");
                    report.failed.push(task.id);
                }
            }
        }

        if !report.is_empty() {
            debug!(?report, "reconcile completed");
        }
        Ok(report)
    }

    /// Ordering rule: add the persistent job row first, then flip `is_scheduled`. If the flip
    /// fails, the added row is removed to preserve the `is_scheduled ⇔ persisted job` invariant.
    async fn create_job(&self, task_id: i64, cron_expr: &str) -> Result<()> {
        self.db
            .scheduled_jobs()
            .upsert(UpsertScheduledJobRequest {
                task_id,
                cron_expression: cron_expr.to_string(),
                next_run_at: Some(compute_next_run_at(cron_expr)?),
                kwargs: None,
            })
            .await?;

        if let Err(e) = self.db.tasks().toggle_scheduled_status(task_id, true).await {
            let _ = self.db.scheduled_jobs().remove_by_task_id(task_id).await;
            return Err(e);
        }

        self.create_trigger_only(task_id, cron_expr).await
    }

    async fn replace_job(&self, task_id: i64, cron_expr: &str) -> Result<()> {
        self.db
            .scheduled_jobs()
            .upsert(UpsertScheduledJobRequest {
                task_id,
                cron_expression: cron_expr.to_string(),
                next_run_at: Some(compute_next_run_at(cron_expr)?),
                kwargs: None,
            })
            .await?;

        let _ = self.db.tasks().toggle_scheduled_status(task_id, true).await;

        if let Some(old_uuid) = self.triggers.write().await.remove(&task_id) {
            let mut cron = self.cron.lock().await;
            let _ = cron.remove(&old_uuid).await;
        }
        self.create_trigger_only(task_id, cron_expr).await
    }

    /// Registers the in-memory cron trigger without touching DB state. Safe to call any number
    /// of times; a stale trigger is replaced rather than duplicated.
    async fn create_trigger_only(&self, task_id: i64, cron_expr: &str) -> Result<()> {
        let dispatcher = self.dispatcher.clone();
        let db = self.db.clone();
        let owned_cron_expr = cron_expr.to_string();
        let job = CronJob::new_async(cron_expr, move |_uuid, _scheduler| {
            let dispatcher = dispatcher.clone();
            let db = db.clone();
            let cron_expr = owned_cron_expr.clone();
            Box::pin(async move {
                // Re-check at fire time: the task may have been deleted or turned non-auto since
                // the last reconcile. A stale trigger skips quietly rather than dispatching.
                match db.tasks().find_by_id(task_id).await {
                    Ok(Some(task)) if task.is_auto => {
                        if let Err(e) = dispatcher.dispatch(task_id).await {
                            error!(task_id, error = %e, "dispatch failed on trigger fire");
                        }
                    }
                    Ok(_) => {
                        debug!(task_id, "trigger fired for a task that no longer exists or is not auto, skipping");
                    }
                    Err(e) => {
                        error!(task_id, error = %e, "failed to look up task on trigger fire");
                    }
                }

                // Keep next_run_at fresh so a later restart's misfire check compares "now"
                // against this fire's successor, not the one that just happened.
                let existing_kwargs = match db.scheduled_jobs().find_by_task_id(task_id).await {
                    Ok(job) => job.and_then(|j| j.kwargs),
                    Err(_) => None,
                };
                if let Err(e) = persist_next_run_at(&db, task_id, &cron_expr, existing_kwargs).await {
                    warn!(task_id, error = %e, "failed to refresh next_run_at after trigger fire");
                }
            })
        })
        .map_err(|e| Error::Scheduler(format!("invalid cron expression '{cron_expr}': {e}")))?;

        let mut cron = self.cron.lock().await;
        let uuid = cron
            .add(job)
            .await
            .map_err(|e| Error::Scheduler(format!("failed to register trigger for task {task_id}: {e}")))?;
        drop(cron);

        self.triggers.write().await.insert(task_id, uuid);
        Ok(())
    }

    /// Ordering rule: clear `is_scheduled` first, then remove the persistent job row. Tolerates
    /// a task that no longer exists (the orphaned-job scenario the schema deliberately allows).
    async fn remove_job(&self, task_id: i64) -> Result<()> {
        let _ = self.db.tasks().toggle_scheduled_status(task_id, false).await;
        self.db.scheduled_jobs().remove_by_task_id(task_id).await?;

        if let Some(uuid) = self.triggers.write().await.remove(&task_id) {
            let mut cron = self.cron.lock().await;
            let _ = cron.remove(&uuid).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_db::{CreateTaskRequest, UpdateTaskRequest};
    use test_support::RecordingDispatcher;

    async fn seed_crawler(db: &Db) -> i64 {
        db.crawlers()
            .create(tc_db::CreateCrawlerRequest {
                crawler_name: "c1".into(),
                crawler_type: "web".into(),
                module_name: "web_crawler".into(),
                base_url: "https://example.com".into(),
                config_file_name: "c1.json".into(),
                is_active: Some(true),
            })
            .await
            .unwrap()
            .id
    }

    async fn new_scheduler(db: Db) -> (Arc<RecordingDispatcher>, TaskScheduler) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = TaskScheduler::new(
            db,
            dispatcher.clone(),
            SchedulerSettings { reload_interval_hr: 1, misfire_grace_secs: 3600 },
        )
        .await
        .unwrap();
        (dispatcher, scheduler)
    }

    #[tokio::test]
    async fn start_twice_fails_already_running() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let (_dispatcher, scheduler) = new_scheduler(db).await;

        scheduler.start().await.unwrap();
        let err = scheduler.start().await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning(_)));
    }

    #[tokio::test]
    async fn stop_without_start_fails_not_running() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let (_dispatcher, scheduler) = new_scheduler(db).await;

        let err = scheduler.stop().await.unwrap_err();
        assert!(matches!(err, Error::NotRunning(_)));
    }

    #[tokio::test]
    async fn reconcile_creates_job_for_auto_task_and_sets_is_scheduled() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
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

        let (_dispatcher, scheduler) = new_scheduler(db.clone()).await;
        let report = scheduler.reload().await.unwrap();
        assert_eq!(report.added, vec![task.id]);

        let reloaded = db.tasks().find_by_id(task.id).await.unwrap().unwrap();
        assert!(reloaded.is_scheduled);

        let job = db.scheduled_jobs().find_by_task_id(task.id).await.unwrap().unwrap();
        assert_eq!(job.job_id, format!("task_{}", task.id));
    }

    #[tokio::test]
    async fn reconcile_removes_orphaned_persistent_job() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        db.scheduled_jobs()
            .upsert(UpsertScheduledJobRequest {
                task_id: 999,
                cron_expression: "0 * * * *".into(),
                next_run_at: None,
                kwargs: None,
            })
            .await
            .unwrap();

        let (_dispatcher, scheduler) = new_scheduler(db.clone()).await;
        let report = scheduler.reload().await.unwrap();

        assert_eq!(report.removed, vec![999]);
        assert!(db.scheduled_jobs().find_by_task_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cron_edit_replaces_persistent_job() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: Some("0 * * * *".into()),
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();

        let (_dispatcher, scheduler) = new_scheduler(db.clone()).await;
        scheduler.reload().await.unwrap();

        db.tasks()
            .update(
                task.id,
                UpdateTaskRequest { cron_expression: Some(Some("*/5 * * * *".into())), ..Default::default() },
            )
            .await
            .unwrap();

        scheduler.add_or_update(task.id).await.unwrap();

        let job = db.scheduled_jobs().find_by_task_id(task.id).await.unwrap().unwrap();
        assert_eq!(job.cron_expression, "*/5 * * * *");
    }

    #[tokio::test]
    async fn reconcile_populates_next_run_at() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
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

        let (_dispatcher, scheduler) = new_scheduler(db.clone()).await;
        scheduler.reload().await.unwrap();

        let job = db.scheduled_jobs().find_by_task_id(task.id).await.unwrap().unwrap();
        assert!(job.next_run_at.is_some());

        let view = scheduler
            .persisted_jobs()
            .await
            .unwrap()
            .into_iter()
            .find(|v| v.task_id == task.id)
            .unwrap();
        assert!(view.next_run_at.is_some());
    }

    #[tokio::test]
    async fn start_fires_misfire_within_grace_window_exactly_once() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: Some("0 * * * *".into()),
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();
        db.tasks().toggle_scheduled_status(task.id, true).await.unwrap();
        let missed_run_at = (chrono::Utc::now() - chrono::Duration::seconds(30)).to_rfc3339();
        db.scheduled_jobs()
            .upsert(UpsertScheduledJobRequest {
                task_id: task.id,
                cron_expression: "0 * * * *".into(),
                next_run_at: Some(missed_run_at.clone()),
                kwargs: None,
            })
            .await
            .unwrap();

        let (dispatcher, scheduler) = new_scheduler(db.clone()).await;
        scheduler.start().await.unwrap();

        assert_eq!(dispatcher.dispatched(), vec![task.id]);

        let job = db.scheduled_jobs().find_by_task_id(task.id).await.unwrap().unwrap();
        let next_run_at = job.next_run_at.unwrap();
        assert_ne!(next_run_at, missed_run_at);
        assert!(tc_core::time::seconds_since(&next_run_at).unwrap() < 0);
    }

    #[tokio::test]
    async fn start_drops_misfire_outside_grace_window() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id,
                task_args: None,
                is_auto: true,
                cron_expression: Some("0 * * * *".into()),
                is_active: Some(true),
                max_retries: None,
                scrape_mode: None,
            })
            .await
            .unwrap();
        db.tasks().toggle_scheduled_status(task.id, true).await.unwrap();
        db.scheduled_jobs()
            .upsert(UpsertScheduledJobRequest {
                task_id: task.id,
                cron_expression: "0 * * * *".into(),
                next_run_at: Some("2024-01-01T00:00:00Z".into()),
                kwargs: None,
            })
            .await
            .unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = TaskScheduler::new(
            db.clone(),
            dispatcher.clone(),
            SchedulerSettings { reload_interval_hr: 1, misfire_grace_secs: 60 },
        )
        .await
        .unwrap();
        scheduler.start().await.unwrap();

        assert!(dispatcher.dispatched().is_empty());
    }

    #[tokio::test]
    async fn add_or_update_is_idempotent() {
        let db = Db::from_pool(test_support::create_test_pool().await);
        let crawler_id = seed_crawler(&db).await;
        let task = db
            .tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
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

        let (_dispatcher, scheduler) = new_scheduler(db.clone()).await;
        scheduler.add_or_update(task.id).await.unwrap();
        scheduler.add_or_update(task.id).await.unwrap();

        assert_eq!(db.scheduled_jobs().list().await.unwrap().len(), 1);
    }
}
