//! The seam the Scheduler dispatches through when a trigger fires.
//!
//! Kept separate from any concrete Executor type for the same reason as `ProgressPublisher`:
//! the Scheduler's tests need a recording stand-in, and both the production executor and
//! `test_support` must depend on this without depending on each other.

use crate::Result;

/// Fire-and-forget submission of a task by id. Implementations must not block the caller on
/// the task's own execution; a submission failure (e.g. already running) is logged by the
/// caller, not propagated as a scheduling failure.
#[async_trait::async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, task_id: i64) -> Result<()>;
}
