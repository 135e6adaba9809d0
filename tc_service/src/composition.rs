// ABOUTME: Explicit composition root wiring Db, Executor, Scheduler, and the CRUD services
// ABOUTME: Replaces the Python ServiceContainer::get_instance(...) lazy singleton registry

use std::sync::Arc;

use tc_config::Config;
use tc_core::{Result, TaskDispatcher};
use tc_crawlers::CrawlerRegistry;
use tc_db::Db;
use tc_executor::{BroadcastProgressBus, TaskExecutor};
use tc_obs::ReadinessGate;
use tc_scheduler::{SchedulerSettings, TaskScheduler};
use tracing::{info, instrument};

use crate::{CrawlerService, TaskService};

/// Built once at process start and shared by `Arc` with the web layer. Owns every long-lived
/// handle the running process needs; there is exactly one of these per process, constructed
/// explicitly rather than lazily materialized on first access.
pub struct AppServices {
    pub db: Db,
    pub executor: Arc<TaskExecutor>,
    pub scheduler: Arc<TaskScheduler>,
    pub tasks: TaskService,
    pub crawlers: CrawlerService,
    /// Flipped ready once `start()` completes; `/readyz` reads this rather than reaching
    /// into the scheduler directly, so readiness reflects the whole bring-up sequence.
    pub readiness: ReadinessGate,
}

impl AppServices {
    /// Wires the executor and scheduler together: the scheduler dispatches by calling back
    /// into the executor, so the executor must exist (and be `Arc`-wrapped) before the
    /// scheduler can be constructed.
    #[instrument(skip(config, db, registry))]
    pub async fn build(config: &Config, db: Db, registry: CrawlerRegistry) -> Result<Self> {
        let publisher = Arc::new(BroadcastProgressBus::new());
        let executor = Arc::new(TaskExecutor::new(
            db.clone(),
            registry,
            &config.executor,
            publisher,
        ));

        let dispatcher: Arc<dyn TaskDispatcher> = executor.clone();
        let scheduler = Arc::new(
            TaskScheduler::new(
                db.clone(),
                dispatcher,
                SchedulerSettings::from(&config.scheduler),
            )
            .await?,
        );

        Ok(Self {
            tasks: TaskService::new(db.clone()),
            crawlers: CrawlerService::new(db.clone()),
            db,
            executor,
            scheduler,
            readiness: ReadinessGate::new(),
        })
    }

    /// Brings the scheduler up (reconciling persisted jobs against the task table) so
    /// start-of-day cron triggers begin firing, then flips the readiness gate. The executor
    /// needs no analogous start: it is ready to accept work as soon as it's constructed.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let report = self.scheduler.start().await?;
        info!(
            added = report.added.len(),
            replaced = report.replaced.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "scheduler reconciled"
        );
        self.readiness.set_ready(true);
        Ok(())
    }

    /// Orderly shutdown: flip readiness false first so load balancers stop routing here, then
    /// stop admitting new scheduled triggers — whatever the executor still has in flight keeps
    /// running, since cancellation is the operator's call, not something shutdown forces (per
    /// the cooperative-cancellation-only concurrency model).
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        self.readiness.set_ready(false);
        self.scheduler.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_crawlers::MockCrawler;

    #[tokio::test]
    async fn build_wires_executor_and_scheduler_against_the_same_db() {
        let pool = test_support::create_test_pool().await;
        let db = Db::from_pool(pool);
        let mut registry = CrawlerRegistry::new();
        registry.register(Arc::new(MockCrawler::new("mock_crawler")));

        let config = Config::default();
        let services = AppServices::build(&config, db, registry).await.unwrap();

        assert!(services.executor.running_tasks().await.is_empty());
        assert!(!services.scheduler.is_running());
        assert!(!services.readiness.is_ready());

        services.start().await.unwrap();
        assert!(services.scheduler.is_running());
        assert!(services.readiness.is_ready());

        services.shutdown().await.unwrap();
        assert!(!services.scheduler.is_running());
        assert!(!services.readiness.is_ready());
    }
}
