//! Where and how to return after leaving the overlay.

use chrono::{DateTime, Utc};
use serde::Serialize;
use waygate_core::types::{ContentId, Vec3};

/// Snapshot of the pre-overlay location.
///
/// A context is built whole by [`ReturnContext::capture`] and only ever
/// invalidated afterwards; it is never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnContext {
    return_content_id: ContentId,
    return_position: Vec3,
    captured_at: DateTime<Utc>,
    valid: bool,
}

impl ReturnContext {
    /// Captures a valid context.
    #[must_use]
    pub fn capture(
        return_content_id: ContentId,
        return_position: Vec3,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            return_content_id,
            return_position,
            captured_at,
            valid: true,
        }
    }

    /// The content to return to.
    #[must_use]
    pub fn return_content_id(&self) -> &ContentId {
        &self.return_content_id
    }

    /// The position to return to.
    #[must_use]
    pub fn return_position(&self) -> Vec3 {
        self.return_position
    }

    /// When the context was captured.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Whether the context may still be used for a return.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the context consumed.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}
