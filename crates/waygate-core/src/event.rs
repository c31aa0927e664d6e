//! Lifecycle event abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name, e.g. `overlay.entered`.
    pub event_type: String,
    /// The overlay episode (one enter/exit round) this event belongs to.
    pub episode_id: Uuid,
    /// Monotonically increasing sequence number within the controller.
    pub sequence_number: i64,
    /// Correlation ID of the command that caused this event.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Trait that all lifecycle events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}

/// Flattened representation of a lifecycle event handed to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Episode this event belongs to.
    pub episode_id: Uuid,
    /// Event type name.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the controller.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl RecordedEvent {
    /// Flattens any [`DomainEvent`] into its recorded form.
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            episode_id: meta.episode_id,
            event_type: event.event_type().to_owned(),
            payload: event.to_payload(),
            sequence_number: meta.sequence_number,
            correlation_id: meta.correlation_id,
            occurred_at: meta.occurred_at,
        }
    }
}
