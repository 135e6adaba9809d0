//! Room-addressed progress event types and the publisher seam the Executor depends on.
//!
//! The Executor is coupled to this trait, not to any particular transport (broadcast channel,
//! websocket, etc.) — production wires a broadcast-channel bus, tests wire a recording one.

use serde::{Deserialize, Serialize};

/// One of the two event names the progress bus emits, per room `task_{task_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ProgressEvent {
    #[serde(rename = "task_progress")]
    TaskProgress {
        task_id: i64,
        progress: u8,
        status: String,
        scrape_phase: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        articles_count: Option<i64>,
    },
    #[serde(rename = "task_finished")]
    TaskFinished { task_id: i64, status: String },
}

impl ProgressEvent {
    pub fn room(task_id: i64) -> String {
        format!("task_{task_id}")
    }
}

/// Best-effort, fan-out publisher. Delivery has no persistence and no replay.
pub trait ProgressPublisher: Send + Sync {
    fn publish(&self, room: &str, event: ProgressEvent);
}

/// A publisher that drops every event. Used where progress reporting is optional (e.g. `TestCrawler`).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressPublisher;

impl ProgressPublisher for NullProgressPublisher {
    fn publish(&self, _room: &str, _event: ProgressEvent) {}
}
