//! ABOUTME: Core types, errors, IDs, and tracing utilities
//! ABOUTME: Foundation crate used by all other orchestrator components

pub mod dispatch;
pub mod error;
pub mod id;
pub mod progress;
pub mod telemetry;
pub mod time;

pub use dispatch::TaskDispatcher;
pub use error::{Error, Result};
pub use id::Id;
pub use progress::{NullProgressPublisher, ProgressEvent, ProgressPublisher};
pub use time::{to_rfc3339, utc_now, MonotonicTimer};
