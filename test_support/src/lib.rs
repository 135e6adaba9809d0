//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Common test fixtures and mocks for all crates

use std::sync::Mutex;
use tc_core::{ProgressEvent, ProgressPublisher, Result, TaskDispatcher};

/// Simple test helper function to demonstrate cross-crate testing
pub fn create_test_id() -> String {
    "test-id-123".to_string()
}

/// Helper for creating temporary directories in tests
pub fn temp_dir_path() -> std::path::PathBuf {
    std::env::temp_dir().join("orchestrator-test")
}

/// Creates a throwaway SQLite file in the OS temp dir and returns a connected, migrated pool.
///
/// Every call gets a unique filename so tests can run concurrently without clobbering each
/// other's state. The file is left on disk; callers don't need to clean it up; it lives under
/// `temp_dir_path()` and is small enough to ignore.
pub async fn create_test_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    let dir = temp_dir_path();
    std::fs::create_dir_all(&dir).expect("create temp test dir");
    let db_path = dir.join(format!("tc_test_{}.db", tc_core::Id::new()));

    let connect_options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .pragma("foreign_keys", "ON");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .expect("connect test sqlite pool");

    sqlx::migrate!("../tc_db/migrations")
        .run(&pool)
        .await
        .expect("run test migrations");

    pool
}

/// Records every event published to it, in order, for assertion in Scheduler/Executor tests.
#[derive(Debug, Default)]
pub struct RecordingProgressBus {
    events: Mutex<Vec<(String, ProgressEvent)>>,
}

impl RecordingProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every `(room, event)` pair published so far, in publish order.
    pub fn events(&self) -> Vec<(String, ProgressEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Returns only the events published to the given task's room.
    pub fn events_for(&self, task_id: i64) -> Vec<ProgressEvent> {
        let room = ProgressEvent::room(task_id);
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == room)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl ProgressPublisher for RecordingProgressBus {
    fn publish(&self, room: &str, event: ProgressEvent) {
        self.events.lock().unwrap().push((room.to_string(), event));
    }
}

/// Records every task id dispatched to it, in order, without actually running anything.
/// Used by Scheduler unit tests that only need to assert "a dispatch happened", not run a crawl.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    dispatched: Mutex<Vec<i64>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<i64> {
        self.dispatched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn dispatch(&self, task_id: i64) -> Result<()> {
        self.dispatched.lock().unwrap().push(task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_bus_preserves_publish_order() {
        let bus = RecordingProgressBus::new();
        bus.publish(
            &ProgressEvent::room(1),
            ProgressEvent::TaskProgress {
                task_id: 1,
                progress: 5,
                status: "RUNNING".into(),
                scrape_phase: "INIT".into(),
                message: "starting".into(),
                articles_count: None,
            },
        );
        bus.publish(
            &ProgressEvent::room(1),
            ProgressEvent::TaskFinished {
                task_id: 1,
                status: "COMPLETED".into(),
            },
        );

        let events = bus.events_for(1);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::TaskProgress { .. }));
        assert!(matches!(events[1], ProgressEvent::TaskFinished { .. }));
    }
}
