//! ABOUTME: Database layer with SQLite, migrations, and repositories
//! ABOUTME: Handles all data persistence for tasks, crawlers, and execution history

use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::time::Duration;
use tc_core::{Error, Result};
use tracing::{debug, info, instrument, warn};

pub mod repositories;

pub use repositories::{
    crawlers::{CrawlerRecord, CrawlerRepository, CreateCrawlerRequest, UpdateCrawlerRequest},
    scheduled_jobs::{ScheduledJob, ScheduledJobsRepository, UpsertScheduledJobRequest},
    task_history::{CreateTaskHistoryRequest, TaskHistoryRecord, TaskHistoryRepository, UpdateTaskHistoryRequest},
    tasks::{CreateTaskRequest, TaskRecord, TaskRepository, UpdateTaskRequest},
};

/// Database connection retry configuration.
#[derive(Debug, Clone)]
pub struct DatabaseRetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for DatabaseRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 15_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl DatabaseRetryConfig {
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = delay_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// SQLite connection pool wrapper used by every repository.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if missing) the database at `db_path`, run migrations, and retry on failure.
    #[instrument(skip(db_path))]
    pub async fn new(db_path: &str) -> Result<Self> {
        Self::new_with_retry(db_path, DatabaseRetryConfig::default()).await
    }

    #[instrument(skip(db_path, retry_config))]
    pub async fn new_with_retry(db_path: &str, retry_config: DatabaseRetryConfig) -> Result<Self> {
        info!(db_path, max_attempts = retry_config.max_attempts, "initializing database");

        let database_url = format!("sqlite://{db_path}");
        let mut last_error = None;

        for attempt in 0..retry_config.max_attempts {
            if attempt > 0 {
                let delay = retry_config.calculate_delay(attempt - 1);
                warn!(attempt = attempt + 1, delay_ms = delay.as_millis(), "retrying database init");
                tokio::time::sleep(delay).await;
            }

            match Self::try_initialize(db_path, &database_url).await {
                Ok(db) => match db.migrate().await {
                    Ok(()) => {
                        info!(attempts = attempt + 1, "database initialized and migrated");
                        return Ok(db);
                    }
                    Err(e) => {
                        warn!(attempt = attempt + 1, error = %e, "migration failed, retrying");
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "connection failed, retrying");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Database(match last_error {
            Some(e) => format!("failed to initialize database after {} attempts: {e}", retry_config.max_attempts),
            None => format!("failed to initialize database after {} attempts", retry_config.max_attempts),
        }))
    }

    async fn try_initialize(db_path: &str, database_url: &str) -> Result<Self> {
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            debug!(database_url, "creating database");
            Sqlite::create_database(database_url)
                .await
                .map_err(|e| Error::Database(format!("failed to create database: {e}")))?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .journal_mode(SqliteJournalMode::Wal)
            .create_if_missing(true)
            .pragma("foreign_keys", "ON")
            .pragma("busy_timeout", "30000");

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| Error::Database(format!("failed to create connection pool: {e}")))?;

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wrap an existing pool (used by tests, which build their own throwaway database).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("health check failed: {e}")))?;
        Ok(())
    }

    pub fn tasks(&self) -> TaskRepository<'_> {
        TaskRepository::new(&self.pool)
    }

    pub fn crawlers(&self) -> CrawlerRepository<'_> {
        CrawlerRepository::new(&self.pool)
    }

    pub fn task_history(&self) -> TaskHistoryRepository<'_> {
        TaskHistoryRepository::new(&self.pool)
    }

    pub fn scheduled_jobs(&self) -> ScheduledJobsRepository<'_> {
        ScheduledJobsRepository::new(&self.pool)
    }
}
