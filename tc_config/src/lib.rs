//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles all application settings from environment variables and files

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use tc_core::{Error, Result};
use validator::Validate;

/// Top-level process configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub scheduler: SchedulerConfig,
    #[validate(nested)]
    pub executor: ExecutorConfig,
    pub logging: LoggingConfig,
}

/// Bind address for the thin REST surface.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// SQLite storage location and pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(range(min = 1, max = 100))]
    pub pool_size: u32,
    pub sqlite_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "crate-orchestrator.db".to_string(),
            pool_size: 10,
            sqlite_wal: true,
        }
    }
}

/// Reconcile cadence and misfire tolerance for the Scheduler.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SchedulerConfig {
    /// Hours between full reconciles of the persisted job set against the task table.
    #[validate(range(min = 1, max = 24))]
    pub reload_interval_hr: u32,
    /// Grace window, in seconds, a due trigger is still honored after its scheduled time.
    #[validate(range(min = 1))]
    pub misfire_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reload_interval_hr: 1,
            misfire_grace_secs: 3600,
        }
    }
}

/// Concurrency limits for the Executor.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExecutorConfig {
    /// Maximum number of tasks the Executor will run concurrently.
    #[validate(range(min = 1, max = 1000))]
    pub max_concurrent_tasks: u32,
    /// Size of the blocking-offload pool used for CPU-bound crawler work (CSV/parsing).
    #[validate(range(min = 1, max = 1000))]
    pub offload_pool_size: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 10,
            offload_pool_size: 5,
        }
    }
}

/// `tracing-subscriber` env-filter level and output format.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// Passed straight through to `RUST_LOG`-style env-filter parsing if set.
    pub level: Option<String>,
    /// `"json"` for structured production logs, anything else for pretty/dev output.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from environment variables (prefix `TC_`) and an optional `.env` file.
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "crate-orchestrator.db")?
            .set_default("database.pool_size", 10)?
            .set_default("database.sqlite_wal", true)?
            .set_default("scheduler.reload_interval_hr", 1)?
            .set_default("scheduler.misfire_grace_secs", 3600)?
            .set_default("executor.max_concurrent_tasks", 10)?
            .set_default("executor.offload_pool_size", 5)?
            .set_default("logging.format", "pretty")?;

        if std::path::Path::new(".env").exists() {
            builder = builder.add_source(File::with_name(".env").required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("TC")
                .try_parsing(true)
                .separator("_"),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build config: {e}")))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("failed to deserialize config: {e}")))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("config validation failed: {e}")))?;

        Ok(parsed)
    }
}
