//! Requests accepted by the overlay controller.

use uuid::Uuid;
use waygate_core::command::Command;
use waygate_core::types::{ContentId, Vec3};

/// Request to move the session into an overlay area.
#[derive(Debug, Clone)]
pub struct RequestEnter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The overlay content to enter.
    pub content_id: ContentId,
    /// Where the player appears inside the overlay.
    pub spawn_position: Vec3,
}

impl RequestEnter {
    /// Builds a request with a fresh correlation ID.
    #[must_use]
    pub fn new(content_id: impl Into<ContentId>, spawn_position: impl Into<Vec3>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            content_id: content_id.into(),
            spawn_position: spawn_position.into(),
        }
    }
}

impl Command for RequestEnter {
    fn command_type(&self) -> &'static str {
        "overlay.request_enter"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Request to leave the active overlay and return.
#[derive(Debug, Clone)]
pub struct RequestExit {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl RequestExit {
    /// Builds a request with a fresh correlation ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }
}

impl Default for RequestExit {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for RequestExit {
    fn command_type(&self) -> &'static str {
        "overlay.request_exit"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
