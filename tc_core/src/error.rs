/// Error taxonomy for the orchestrator core.
///
/// Maps onto the HTTP surface at the `tc_web` boundary: `Validation`/`NotFound` carry their own
/// status, `AlreadyRunning`/`NotRunning` are conflicts, everything else is a 500.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already running: {0}")]
    AlreadyRunning(String),

    #[error("not running: {0}")]
    NotRunning(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("crawler error: {0}")]
    Crawler(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
