// ABOUTME: Bounded concurrent task executor: the bridge between Scheduler/API and crawlers
// ABOUTME: Owns the in-memory running-task map and the three disjoint short transactions per run

mod progress_bus;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tc_config::ExecutorConfig;
use tc_core::{time::now_iso8601, Error, ProgressEvent, ProgressPublisher, Result, TaskDispatcher};
use tc_crawlers::{Crawler, CrawlResult, CrawlerRegistry, GlobalParams, ScrapeOptions};
use tc_db::repositories::{crawlers, task_history, tasks};
use tc_db::{CreateTaskHistoryRequest, Db, UpdateTaskHistoryRequest, UpdateTaskRequest};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub use progress_bus::BroadcastProgressBus;

/// Progress heuristic used whenever a crawler doesn't report its own progress
/// (`Crawler::progress` returns `None`): caps at 95% so the terminal 100% is only ever
/// reported by the Finalize step, never guessed.
fn elapsed_progress(started_at: Instant) -> u8 {
    let elapsed = started_at.elapsed().as_secs_f64();
    let pct = (elapsed / 300.0 * 100.0).floor();
    pct.clamp(0.0, 95.0) as u8
}

struct RunningTask {
    handle: JoinHandle<()>,
    crawler: Arc<dyn Crawler>,
    started_at: Instant,
    options: ScrapeOptions,
}

/// Point-in-time status snapshot per SPEC_FULL §4.2's state-reporting precedence: in-memory
/// running beats the latest history row, which beats the task table's mirrored fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExecutionStatus {
    pub task_id: i64,
    pub task_status: String,
    pub scrape_phase: String,
    pub progress: u8,
    pub message: Option<String>,
    pub articles_count: Option<i64>,
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Bounded concurrent executor. One per process; shared via `Arc` from the composition root.
pub struct TaskExecutor {
    db: Db,
    crawlers: CrawlerRegistry,
    semaphore: Arc<Semaphore>,
    publisher: Arc<dyn ProgressPublisher>,
    running: Arc<RwLock<HashMap<i64, RunningTask>>>,
}

impl TaskExecutor {
    pub fn new(db: Db, crawlers: CrawlerRegistry, config: &ExecutorConfig, publisher: Arc<dyn ProgressPublisher>) -> Self {
        Self {
            db,
            crawlers,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_tasks as usize)),
            publisher,
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn emit(&self, task_id: i64, event: ProgressEvent) {
        self.publisher.publish(&ProgressEvent::room(task_id), event);
    }

    /// `Execute(taskId, options, isAsync)`. When `is_async` is `false` this awaits completion
    /// and returns the crawler's result; when `true` (the default) it returns as soon as the
    /// task is registered and running, matching the Python original's fire-and-forget default.
    #[instrument(skip(self, options))]
    pub async fn execute(&self, task_id: i64, options: ScrapeOptions, is_async: bool) -> Result<Option<CrawlResult>> {
        let handle_rx = self.start_run(task_id, options).await?;
        if is_async {
            return Ok(None);
        }
        let result = handle_rx
            .await
            .map_err(|e| Error::Crawler(format!("task {task_id} execution panicked: {e}")))?;
        Ok(Some(result))
    }

    pub async fn collect_links_only(&self, task_id: i64, is_async: bool) -> Result<Option<CrawlResult>> {
        self.execute(task_id, ScrapeOptions::links_only(), is_async).await
    }

    pub async fn fetch_content_only(&self, task_id: i64, is_async: bool) -> Result<Option<CrawlResult>> {
        self.execute(task_id, ScrapeOptions::content_only(), is_async).await
    }

    pub async fn fetch_full_article(&self, task_id: i64, is_async: bool) -> Result<Option<CrawlResult>> {
        self.execute(task_id, ScrapeOptions::full_article(), is_async).await
    }

    /// Dry run against a named crawler, bypassing the task catalog entirely: `task_id = 0`,
    /// forced links-only, capped pages/articles, no persistence. Mirrors
    /// `task_executor_service.py::test_crawler`'s parameter clamping.
    #[instrument(skip(self))]
    pub async fn test_crawler(&self, crawler_name: &str) -> Result<CrawlResult> {
        let crawler = self
            .crawlers
            .get(crawler_name)
            .ok_or_else(|| Error::Crawler(format!("no crawler registered under '{crawler_name}'")))?;
        let options = ScrapeOptions::test_dry_run();
        tokio::time::timeout(
            std::time::Duration::from_secs(options.timeout_secs),
            crawler.execute_task(0, &options),
        )
        .await
        .map_err(|_| Error::Transient(format!("test crawl of '{crawler_name}' timed out")))?
    }

    /// Steps 1-3 of the Execute pipeline: pre-check, register in-memory, emit start event, spawn
    /// the run. Returns a handle the caller can await for the synchronous `Execute` variant.
    async fn start_run(&self, task_id: i64, options: ScrapeOptions) -> Result<tokio::sync::oneshot::Receiver<CrawlResult>> {
        // Atomic check-and-insert under one write-lock acquisition: nothing can race between
        // the "is it already running" check and claiming the slot.
        let mut running = self.running.write().await;
        if running.contains_key(&task_id) {
            return Err(Error::AlreadyRunning(format!("task {task_id} is already running")));
        }

        let crawler = self.precheck_and_mark_running(task_id).await?;

        self.emit(
            task_id,
            ProgressEvent::TaskProgress {
                task_id,
                progress: 5,
                status: "RUNNING".into(),
                scrape_phase: "INIT".into(),
                message: "starting".into(),
                articles_count: None,
            },
        );

        let (tx, rx) = tokio::sync::oneshot::channel();
        let semaphore = self.semaphore.clone();
        let db = self.db.clone();
        let publisher = self.publisher.clone();
        let running_map = self.running.clone();
        let crawler_for_run = crawler.clone();
        let options_for_run = options.clone();

        let handle = tokio::spawn(async move {
            // Submission must not block the caller beyond this brief hand-off (SPEC_FULL §5):
            // the AlreadyRunning fail-fast above already happened before we got here, so waiting
            // for a pool permit here only delays this task's own start, never another caller.
            let _permit = semaphore.acquire().await;
            let result = run_task(&db, publisher.as_ref(), &crawler_for_run, task_id, &options_for_run).await;
            running_map.write().await.remove(&task_id);
            let _ = tx.send(result);
        });

        running.insert(
            task_id,
            RunningTask {
                handle,
                crawler,
                started_at: Instant::now(),
                options,
            },
        );

        Ok(rx)
    }

    /// Pre-check transaction (step 1 of Execute): fail fast if the DB already has a running
    /// history row for this task, then create the History row and flip the Task to RUNNING/INIT.
    async fn precheck_and_mark_running(&self, task_id: i64) -> Result<Arc<dyn Crawler>> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        let task = tasks::find_by_id(&mut *tx, task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;

        if task_history::find_running(&mut *tx, task_id).await?.is_some() {
            return Err(Error::AlreadyRunning(format!("task {task_id} is already running")));
        }

        let crawler_record = crawlers::find_by_id(&mut *tx, task.crawler_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("crawler {} not found", task.crawler_id)))?;

        let crawler = self.crawlers.get(&crawler_record.module_name).ok_or_else(|| {
            Error::Crawler(format!(
                "no crawler registered for module '{}'",
                crawler_record.module_name
            ))
        })?;

        task_history::create(
            &mut *tx,
            CreateTaskHistoryRequest {
                task_id,
                start_time: now_iso8601(),
                task_status: "RUNNING".into(),
                message: Some("starting".into()),
            },
        )
        .await?;

        tasks::update(
            &mut *tx,
            task_id,
            UpdateTaskRequest {
                task_status: Some("RUNNING".into()),
                scrape_phase: Some("INIT".into()),
                ..Default::default()
            },
        )
        .await?;

        tx.commit().await.map_err(db_err)?;
        Ok(crawler)
    }

    /// `Status(taskId)` per the precedence rules: in-memory running, then latest terminal
    /// history row, then latest (exceptional) running history row estimated from elapsed time,
    /// then the task table's own mirrored fields.
    #[instrument(skip(self))]
    pub async fn status(&self, task_id: i64) -> Result<ExecutionStatus> {
        if let Some(running) = self.running.read().await.get(&task_id) {
            let progress = match running.crawler.progress(task_id).await {
                Some(p) => p,
                None => elapsed_progress(running.started_at),
            };
            return Ok(ExecutionStatus {
                task_id,
                task_status: "RUNNING".into(),
                scrape_phase: "CONTENT_SCRAPING".into(),
                progress,
                message: Some("in progress".into()),
                articles_count: None,
            });
        }

        if let Some(history) = self.db.task_history().get_latest(task_id).await? {
            if history.end_time.is_some() {
                return Ok(ExecutionStatus {
                    task_id,
                    task_status: history.task_status.clone(),
                    scrape_phase: terminal_phase_for(&history.task_status),
                    progress: if history.task_status == "COMPLETED" { 100 } else { 0 },
                    message: history.message,
                    articles_count: history.articles_count,
                });
            }

            // Exceptional: a RUNNING row survives with nothing in memory, e.g. after a crash.
            // There's no in-process clock to measure elapsed time against, so this reports a
            // fixed mid-range estimate rather than fabricating precision the system doesn't have.
            warn!(task_id, "history row is RUNNING with no in-memory executor entry");
            return Ok(ExecutionStatus {
                task_id,
                task_status: "RUNNING".into(),
                scrape_phase: "UNKNOWN".into(),
                progress: 50,
                message: history.message,
                articles_count: history.articles_count,
            });
        }

        let task = self
            .db
            .tasks()
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;

        Ok(ExecutionStatus {
            task_id,
            task_status: task.task_status,
            scrape_phase: task.scrape_phase,
            progress: 0,
            message: task.last_run_message,
            articles_count: None,
        })
    }

    pub async fn running_tasks(&self) -> Vec<i64> {
        self.running.read().await.keys().copied().collect()
    }

    /// `Cancel(taskId)`: the 6-step cancellation algorithm from SPEC_FULL §4.2.
    #[instrument(skip(self))]
    pub async fn cancel(&self, task_id: i64) -> Result<bool> {
        // Step 1: atomically read the handle+crawler, remove the entry regardless of outcome
        // (step 6 happens unconditionally once we've decided to cancel at all).
        let entry = self.running.write().await.remove(&task_id);
        let Some(entry) = entry else {
            return Ok(false);
        };

        // Step 2: aborting before the spawned future reached the crawler call means the run
        // never did any real work.
        let handle_cancel_succeeded = !entry.handle.is_finished();
        entry.handle.abort();

        // Step 3: propagate the task's own save-on-cancel settings into the crawler's global
        // params and ask it to stop cooperatively. A save_partial_results_on_cancel=false task
        // must not have its partial results persisted just because a cancel happened.
        let params = GlobalParams {
            save_partial_results_on_cancel: entry.options.save_partial_results_on_cancel,
            save_partial_to_database: entry.options.save_partial_to_database,
        };
        let crawler_cancel_succeeded = entry.crawler.cancel_task(task_id, params).await;

        if !handle_cancel_succeeded && !crawler_cancel_succeeded {
            debug!(task_id, "cancel requested but task had already finished");
            return Ok(false);
        }

        // Step 4-5: locate or synthesize the CANCELLED history row and mirror it onto the task,
        // in one transaction.
        self.finalize_cancellation(task_id).await?;

        self.emit(
            task_id,
            ProgressEvent::TaskProgress {
                task_id,
                progress: 100,
                status: "CANCELLED".into(),
                scrape_phase: "CANCELLED".into(),
                message: "cancelled".into(),
                articles_count: None,
            },
        );
        self.emit(
            task_id,
            ProgressEvent::TaskFinished {
                task_id,
                status: "CANCELLED".into(),
            },
        );

        Ok(true)
    }

    async fn finalize_cancellation(&self, task_id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await.map_err(db_err)?;

        match task_history::find_running(&mut *tx, task_id).await? {
            Some(history) => {
                task_history::update(
                    &mut *tx,
                    history.id,
                    UpdateTaskHistoryRequest {
                        end_time: Some(now_iso8601()),
                        task_status: Some("CANCELLED".into()),
                        message: Some("cancelled by operator".into()),
                        ..Default::default()
                    },
                )
                .await?;
            }
            None => {
                // No running row to close — synthesize one so cancellation still leaves an
                // audit trail (e.g. cancel raced the run's own finalize).
                let now = now_iso8601();
                let synthesized = task_history::create(
                    &mut *tx,
                    CreateTaskHistoryRequest {
                        task_id,
                        start_time: now.clone(),
                        task_status: "RUNNING".into(),
                        message: Some("synthesized on cancel".into()),
                    },
                )
                .await?;
                task_history::update(
                    &mut *tx,
                    synthesized.id,
                    UpdateTaskHistoryRequest {
                        end_time: Some(now_iso8601()),
                        task_status: Some("CANCELLED".into()),
                        message: Some("cancelled by operator".into()),
                        ..Default::default()
                    },
                )
                .await?;
            }
        }

        tasks::update(
            &mut *tx,
            task_id,
            UpdateTaskRequest {
                task_status: Some("CANCELLED".into()),
                scrape_phase: Some("CANCELLED".into()),
                last_run_at: Some(now_iso8601()),
                last_run_success: Some(false),
                last_run_message: Some("cancelled by operator".into()),
                ..Default::default()
            },
        )
        .await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

fn terminal_phase_for(task_status: &str) -> String {
    match task_status {
        "COMPLETED" => "COMPLETED",
        "CANCELLED" => "CANCELLED",
        _ => "FAILED",
    }
    .to_string()
}

/// Steps 4-7 of the Execute pipeline, run inside the spawned task: invoke the crawler, finalize
/// history+task in one transaction, emit progress+finished events, and report the result back
/// to whoever is awaiting a synchronous `Execute` call.
async fn run_task(
    db: &Db,
    publisher: &dyn ProgressPublisher,
    crawler: &Arc<dyn Crawler>,
    task_id: i64,
    options: &ScrapeOptions,
) -> CrawlResult {
    let outcome = crawler.execute_task(task_id, options).await;

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(task_id, error = %e, "crawler execution failed");
            if let Err(finalize_err) = finalize_failure(db, task_id, &e.to_string()).await {
                error!(task_id, error = %finalize_err, "failed to finalize failed task");
            }
            publisher.publish(
                &ProgressEvent::room(task_id),
                ProgressEvent::TaskProgress {
                    task_id,
                    progress: 100,
                    status: "FAILED".into(),
                    scrape_phase: "FAILED".into(),
                    message: e.to_string(),
                    articles_count: None,
                },
            );
            publisher.publish(
                &ProgressEvent::room(task_id),
                ProgressEvent::TaskFinished {
                    task_id,
                    status: "FAILED".into(),
                },
            );
            return CrawlResult::failed(e.to_string());
        }
    };

    let status = if result.success { "COMPLETED" } else { "FAILED" };
    if let Err(e) = finalize_run(db, task_id, status, &result).await {
        error!(task_id, error = %e, "failed to finalize completed task");
    }

    publisher.publish(
        &ProgressEvent::room(task_id),
        ProgressEvent::TaskProgress {
            task_id,
            progress: 100,
            status: status.into(),
            scrape_phase: "COMPLETED".into(),
            message: result.message.clone(),
            articles_count: Some(result.articles_count),
        },
    );
    publisher.publish(
        &ProgressEvent::room(task_id),
        ProgressEvent::TaskFinished {
            task_id,
            status: status.into(),
        },
    );

    info!(task_id, status, articles_count = result.articles_count, "task finished");
    result
}

async fn finalize_run(db: &Db, task_id: i64, status: &str, result: &CrawlResult) -> Result<()> {
    let mut tx = db.pool().begin().await.map_err(db_err)?;

    if let Some(history) = task_history::find_running(&mut *tx, task_id).await? {
        task_history::update(
            &mut *tx,
            history.id,
            UpdateTaskHistoryRequest {
                end_time: Some(now_iso8601()),
                task_status: Some(status.to_string()),
                message: Some(result.message.clone()),
                articles_count: Some(result.articles_count),
                success: Some(result.success),
            },
        )
        .await?;
    }

    // retry_count is crawler-internal (Design Notes §9) — the executor never touches it here.
    tasks::update(
        &mut *tx,
        task_id,
        UpdateTaskRequest {
            task_status: Some(status.to_string()),
            scrape_phase: Some(if result.success { "COMPLETED".into() } else { "FAILED".into() }),
            last_run_at: Some(now_iso8601()),
            last_run_success: Some(result.success),
            last_run_message: Some(result.message.clone()),
            ..Default::default()
        },
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    Ok(())
}

async fn finalize_failure(db: &Db, task_id: i64, message: &str) -> Result<()> {
    let mut tx = db.pool().begin().await.map_err(db_err)?;

    if let Some(history) = task_history::find_running(&mut *tx, task_id).await? {
        task_history::update(
            &mut *tx,
            history.id,
            UpdateTaskHistoryRequest {
                end_time: Some(now_iso8601()),
                task_status: Some("FAILED".into()),
                message: Some(message.to_string()),
                success: Some(false),
                ..Default::default()
            },
        )
        .await?;
    }

    tasks::update(
        &mut *tx,
        task_id,
        UpdateTaskRequest {
            task_status: Some("FAILED".into()),
            scrape_phase: Some("FAILED".into()),
            last_run_at: Some(now_iso8601()),
            last_run_success: Some(false),
            last_run_message: Some(message.to_string()),
            ..Default::default()
        },
    )
    .await?;

    tx.commit().await.map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl TaskDispatcher for TaskExecutor {
    /// Bridges the Scheduler's trigger fire to a real run: always async, matching the Python
    /// original's auto-dispatch path. A task that's already running (stale trigger racing a
    /// manual run) is logged and swallowed rather than propagated as a dispatch failure.
    async fn dispatch(&self, task_id: i64) -> Result<()> {
        let task = self
            .db
            .tasks()
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {task_id} not found")))?;

        let mode = tc_crawlers::ScrapeMode::from_db_str(&task.scrape_mode).unwrap_or(tc_crawlers::ScrapeMode::FullScrape);
        let options = ScrapeOptions {
            mode,
            ..ScrapeOptions::default()
        };

        match self.execute(task_id, options, true).await {
            Ok(_) => Ok(()),
            Err(Error::AlreadyRunning(msg)) => {
                debug!(task_id, msg, "dispatch skipped: task already running");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Best-effort cleanup: abort every in-flight run so a dropped executor doesn't leak tasks.
/// `try_write` is used because `Drop` cannot be async; a contended lock just means cancellation
/// is skipped, which is acceptable since the process is going away regardless.
impl Drop for TaskExecutor {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.try_write() {
            for (task_id, task) in running.drain() {
                debug!(task_id, "aborting in-flight task on executor drop");
                task.handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tc_db::repositories::crawlers::CreateCrawlerRequest;
    use tc_db::repositories::tasks::CreateTaskRequest;
    use tc_crawlers::MockCrawler;
    use test_support::RecordingProgressBus;

    async fn make_executor() -> (TaskExecutor, Db, Arc<RecordingProgressBus>) {
        let pool = test_support::create_test_pool().await;
        let db = Db::from_pool(pool);
        let mut registry = CrawlerRegistry::new();
        registry.register(Arc::new(MockCrawler::new("demo_crawler")));
        let publisher = Arc::new(RecordingProgressBus::new());
        let config = ExecutorConfig::default();
        let executor = TaskExecutor::new(db.clone(), registry, &config, publisher.clone());
        (executor, db, publisher)
    }

    async fn seed_task(db: &Db) -> i64 {
        let crawler = db
            .crawlers()
            .create(CreateCrawlerRequest {
                crawler_name: "demo".into(),
                crawler_type: "web".into(),
                module_name: "demo_crawler".into(),
                base_url: "https://example.com".into(),
                config_file_name: "demo.json".into(),
                is_active: Some(true),
            })
            .await
            .unwrap();

        db.tasks()
            .create(CreateTaskRequest {
                task_name: "T1".into(),
                crawler_id: crawler.id,
                task_args: None,
                is_auto: false,
                cron_expression: None,
                is_active: Some(true),
                max_retries: None,
                scrape_mode: Some("FULL_SCRAPE".into()),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn execute_sync_returns_crawl_result_and_marks_task_completed() {
        let (executor, db, publisher) = make_executor().await;
        let task_id = seed_task(&db).await;

        let result = executor
            .execute(task_id, ScrapeOptions::full_article(), false)
            .await
            .unwrap()
            .expect("synchronous execute returns a result");
        assert!(result.success);

        let task = db.tasks().find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.task_status, "COMPLETED");
        assert_eq!(task.last_run_success, Some(true));

        let events = publisher.events_for(task_id);
        assert!(matches!(events.first(), Some(ProgressEvent::TaskProgress { progress: 5, .. })));
        assert!(matches!(events.last(), Some(ProgressEvent::TaskFinished { status, .. }) if status == "COMPLETED"));
    }

    #[tokio::test]
    async fn second_execute_while_running_is_rejected() {
        let (executor, db, _publisher) = make_executor().await;
        let task_id = seed_task(&db).await;

        // Hold the slot open manually to simulate an in-flight run without racing a real one.
        let mut running = executor.running.write().await;
        running.insert(
            task_id,
            RunningTask {
                handle: tokio::spawn(async { std::future::pending::<()>().await }),
                crawler: Arc::new(MockCrawler::new("demo_crawler")),
                started_at: Instant::now(),
                options: ScrapeOptions::default(),
            },
        );
        drop(running);

        let err = executor.execute(task_id, ScrapeOptions::default(), true).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning(_)));
    }

    #[tokio::test]
    async fn cancel_unknown_task_returns_false() {
        let (executor, _db, _publisher) = make_executor().await;
        assert!(!executor.cancel(999).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_propagates_the_task_s_own_save_partial_flags() {
        let (executor, db, _publisher) = make_executor().await;
        let task_id = seed_task(&db).await;

        let mock = Arc::new(MockCrawler::new("demo_crawler"));
        let mut running = executor.running.write().await;
        running.insert(
            task_id,
            RunningTask {
                handle: tokio::spawn(async { std::future::pending::<()>().await }),
                crawler: mock.clone(),
                started_at: Instant::now(),
                options: ScrapeOptions {
                    save_partial_results_on_cancel: false,
                    save_partial_to_database: false,
                    ..ScrapeOptions::default()
                },
            },
        );
        drop(running);

        assert!(executor.cancel(task_id).await.unwrap());

        let recorded = mock.last_global_params().await;
        assert!(!recorded.save_partial_results_on_cancel);
        assert!(!recorded.save_partial_to_database);
    }

    #[tokio::test]
    async fn status_falls_back_to_task_table_when_never_run() {
        let (executor, db, _publisher) = make_executor().await;
        let task_id = seed_task(&db).await;

        let status = executor.status(task_id).await.unwrap();
        assert_eq!(status.task_status, "INIT");
        assert_eq!(status.progress, 0);
    }

    #[tokio::test]
    async fn test_crawler_uses_dry_run_options_and_never_touches_the_database() {
        let (executor, _db, _publisher) = make_executor().await;
        let result = executor.test_crawler("demo_crawler").await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_crawler_rejects_unknown_name() {
        let (executor, _db, _publisher) = make_executor().await;
        let err = executor.test_crawler("missing").await.unwrap_err();
        assert!(matches!(err, Error::Crawler(_)));
    }

    #[tokio::test]
    async fn dispatch_runs_the_task_asynchronously() {
        let (executor, db, publisher) = make_executor().await;
        let task_id = seed_task(&db).await;

        TaskDispatcher::dispatch(&executor, task_id).await.unwrap();

        // Give the spawned run a moment to finish (it's synchronous mock work, but still async).
        for _ in 0..50 {
            if !executor.running_tasks().await.contains(&task_id) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let task = db.tasks().find_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.task_status, "COMPLETED");
        assert!(!publisher.events_for(task_id).is_empty());
    }
}
