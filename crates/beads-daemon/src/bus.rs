//! In-process pub/sub event bus.
//!
//! Subscribers receive only messages published after the subscription was
//! created (no replay). Disconnected subscribers are pruned on publish. The
//! bus is a wake signal, never an authority: consumers re-read the store
//! after every event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Well-known event subjects.
pub mod subjects {
    pub const ISSUE_CREATED: &str = "issue.created";
    pub const ISSUE_UPDATED: &str = "issue.updated";
    pub const ISSUE_CLOSED: &str = "issue.closed";
    pub const DECISION_CREATED: &str = "decision.created";
    pub const DECISION_RESPONDED: &str = "decision.responded";
}

/// One event on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    pub subject: String,
    pub issue_id: String,
    #[serde(default)]
    pub actor: String,
}

impl BusEvent {
    pub fn new(
        subject: impl Into<String>,
        issue_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            issue_id: issue_id.into(),
            actor: actor.into(),
        }
    }
}

/// A broadcast-style event bus built on top of flume channels.
///
/// Each call to [`EventBus::subscribe`] creates a new receiver that will
/// receive all messages published after the subscription was created. The
/// bus is thread-safe and can be cloned cheaply.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<BusEvent>>>>,
    published: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new, empty event bus with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            published: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a new subscriber and return its receiving end.
    pub fn subscribe(&self) -> flume::Receiver<BusEvent> {
        let (tx, rx) = flume::unbounded();
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.push(tx);
        rx
    }

    /// Publish an event to all current subscribers.
    ///
    /// Disconnected subscribers (whose receivers have been dropped) are
    /// automatically pruned.
    pub fn publish(&self, event: BusEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let mut senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Return the number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        let senders = self.inner.lock().expect("EventBus lock poisoned");
        senders.len()
    }

    /// Total events published over the bus lifetime.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_get_new_messages_only() {
        let bus = EventBus::new();
        bus.publish(BusEvent::new(subjects::ISSUE_CREATED, "bd-old", "alice"));

        let rx = bus.subscribe();
        bus.publish(BusEvent::new(subjects::ISSUE_UPDATED, "bd-new", "alice"));

        // Only the post-subscription event arrives.
        let event = rx.try_recv().unwrap();
        assert_eq!(event.issue_id, "bd-new");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn all_subscribers_receive() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(BusEvent::new(subjects::DECISION_RESPONDED, "bd-d1", "h"));
        assert_eq!(rx1.try_recv().unwrap().issue_id, "bd-d1");
        assert_eq!(rx2.try_recv().unwrap().issue_id, "bd-d1");
    }

    #[test]
    fn dropped_subscribers_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(BusEvent::new(subjects::ISSUE_CREATED, "bd-x", "a"));
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.published_count(), 1);
    }
}
