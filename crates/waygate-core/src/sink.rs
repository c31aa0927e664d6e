//! Lifecycle event sink abstraction.

use std::sync::Mutex;

use crate::event::RecordedEvent;

/// Receives lifecycle events emitted by the controller.
///
/// Recording is synchronous: events are emitted from the interception hook,
/// which must not suspend.
pub trait LifecycleEventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: RecordedEvent);
}

/// Bounded in-memory sink keeping the most recent events.
#[derive(Debug)]
pub struct InMemoryEventSink {
    capacity: usize,
    events: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryEventSink {
    /// Creates a sink that retains at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of the retained events, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl LifecycleEventSink for InMemoryEventSink {
    fn record(&self, event: RecordedEvent) {
        let Ok(mut events) = self.events.lock() else {
            tracing::warn!("event sink lock poisoned; dropping event");
            return;
        };
        if events.len() == self.capacity {
            events.remove(0);
        }
        events.push(event);
    }
}
