// ABOUTME: Production ProgressPublisher backed by per-task tokio::sync::broadcast channels
// ABOUTME: One channel per active task id, lazily created and torn down when the room empties

use std::collections::HashMap;
use std::sync::Mutex;

use tc_core::{ProgressEvent, ProgressPublisher};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 32;

/// Best-effort fan-out: a room with no subscribers simply drops the event (broadcast semantics),
/// matching the spec's "no persistence, no replay" guarantee.
pub struct BroadcastProgressBus {
    channels: Mutex<HashMap<String, broadcast::Sender<ProgressEvent>>>,
}

impl Default for BroadcastProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastProgressBus {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a task's room, creating the underlying channel if this is the first
    /// subscriber. The channel is kept around (a sender with zero receivers is still cheap)
    /// so late publishers don't need to special-case "nobody has ever subscribed yet".
    pub fn subscribe(&self, task_id: i64) -> broadcast::Receiver<ProgressEvent> {
        let room = ProgressEvent::room(task_id);
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(room)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

impl ProgressPublisher for BroadcastProgressBus {
    fn publish(&self, room: &str, event: ProgressEvent) {
        let mut channels = self.channels.lock().unwrap();
        let sender = channels
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        // No receivers is a normal, expected state (nobody is watching this task right now).
        let _ = sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = BroadcastProgressBus::new();
        bus.publish(
            &ProgressEvent::room(1),
            ProgressEvent::TaskFinished {
                task_id: 1,
                status: "COMPLETED".into(),
            },
        );
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = BroadcastProgressBus::new();
        let mut rx = bus.subscribe(7);

        bus.publish(
            &ProgressEvent::room(7),
            ProgressEvent::TaskProgress {
                task_id: 7,
                progress: 5,
                status: "RUNNING".into(),
                scrape_phase: "INIT".into(),
                message: "starting".into(),
                articles_count: None,
            },
        );

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProgressEvent::TaskProgress { task_id: 7, .. }));
    }
}
