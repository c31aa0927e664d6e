//! Overlay lifecycle state.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;
use waygate_core::types::ContentId;

/// Where the controller is in an overlay episode.
///
/// Leaving `Idle` always passes through `Entering` before `Active`, and
/// `Active` always passes through `Exiting` before `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    /// No overlay; the host runs normally.
    #[default]
    Idle,
    /// Entry sequence in flight.
    Entering,
    /// The session is inside the overlay content.
    Active,
    /// Returning to the captured context.
    Exiting,
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Entering => "entering",
            Self::Active => "active",
            Self::Exiting => "exiting",
        };
        f.write_str(name)
    }
}

/// A requested load whose arrival has not been observed yet.
///
/// Its presence is the pending flag: at most one exists at a time, and it
/// is cleared as soon as arrival is observed or the entry unwinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    /// The overlay content being entered.
    pub target_content_id: ContentId,
    /// The episode that requested the load.
    pub episode_id: Uuid,
}

impl PendingEntry {
    /// Creates a pending entry for `target_content_id`.
    #[must_use]
    pub fn new(target_content_id: ContentId, episode_id: Uuid) -> Self {
        Self {
            target_content_id,
            episode_id,
        }
    }

    /// Whether `content_id` is the arrival this entry waits for.
    #[must_use]
    pub fn awaits(&self, content_id: &ContentId) -> bool {
        &self.target_content_id == content_id
    }
}
