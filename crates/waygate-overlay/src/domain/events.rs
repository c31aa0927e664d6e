//! Lifecycle events emitted by the overlay controller.

use serde::{Deserialize, Serialize};
use waygate_core::event::{DomainEvent, EventMetadata};
use waygate_core::guard::TransitionOrigin;
use waygate_core::types::{ContentId, Vec3};

/// Emitted when an entry request is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRequested {
    /// The overlay content being entered.
    pub content_id: ContentId,
    /// Requested spawn position inside the overlay.
    pub spawn_position: Vec3,
    /// The content the session will return to.
    pub return_content_id: ContentId,
}

/// Emitted once the overlay is active and reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entered {
    /// The overlay content.
    pub content_id: ContentId,
    /// Reconciliation steps that failed and were skipped.
    pub skipped_steps: Vec<String>,
}

/// Emitted when an entry unwinds back to idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFailed {
    /// The overlay content that could not be entered.
    pub content_id: ContentId,
    /// Why entry failed.
    pub reason: String,
}

/// Emitted when an explicit exit starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRequested {
    /// The content being returned to.
    pub return_content_id: ContentId,
}

/// Emitted when a host transition is intercepted while active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intercepted {
    /// Who started the transition.
    pub origin: TransitionOrigin,
    /// The target the host declared, if any.
    pub declared_target: Option<ContentId>,
    /// The target the transition proceeds toward.
    pub effective_target: ContentId,
}

/// Emitted when the session is back and the controller is idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Returned {
    /// Where the session arrived.
    pub content_id: ContentId,
    /// Whether arrival was assumed after the wait expired.
    pub arrival_timed_out: bool,
}

/// Event type identifier for [`EntryRequested`].
pub const ENTRY_REQUESTED_EVENT_TYPE: &str = "overlay.entry_requested";

/// Event type identifier for [`Entered`].
pub const ENTERED_EVENT_TYPE: &str = "overlay.entered";

/// Event type identifier for [`EntryFailed`].
pub const ENTRY_FAILED_EVENT_TYPE: &str = "overlay.entry_failed";

/// Event type identifier for [`ExitRequested`].
pub const EXIT_REQUESTED_EVENT_TYPE: &str = "overlay.exit_requested";

/// Event type identifier for [`Intercepted`].
pub const INTERCEPTED_EVENT_TYPE: &str = "overlay.intercepted";

/// Event type identifier for [`Returned`].
pub const RETURNED_EVENT_TYPE: &str = "overlay.returned";

/// Event payload variants for the overlay lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayEventKind {
    /// An entry request was accepted.
    EntryRequested(EntryRequested),
    /// The overlay became active.
    Entered(Entered),
    /// Entry failed and unwound.
    EntryFailed(EntryFailed),
    /// An explicit exit started.
    ExitRequested(ExitRequested),
    /// A host transition was intercepted.
    Intercepted(Intercepted),
    /// The session returned.
    Returned(Returned),
}

impl OverlayEventKind {
    /// The dotted type name of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EntryRequested(_) => ENTRY_REQUESTED_EVENT_TYPE,
            Self::Entered(_) => ENTERED_EVENT_TYPE,
            Self::EntryFailed(_) => ENTRY_FAILED_EVENT_TYPE,
            Self::ExitRequested(_) => EXIT_REQUESTED_EVENT_TYPE,
            Self::Intercepted(_) => INTERCEPTED_EVENT_TYPE,
            Self::Returned(_) => RETURNED_EVENT_TYPE,
        }
    }
}

/// Lifecycle event envelope.
#[derive(Debug, Clone)]
pub struct OverlayEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OverlayEventKind,
}

impl DomainEvent for OverlayEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("OverlayEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
