//! Collaborator ports.
//!
//! The controller only ever talks to the host through these traits. Each
//! adapter exposes the handful of fields the controller needs, so host
//! internals can change without touching the lifecycle logic.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OverlayError;
use crate::guard::{HostEventGuard, TransitionInfo};
use crate::sink::LifecycleEventSink;
use crate::types::{ContentHandle, ContentId, FieldValue, ObjectHandle, SessionField, Vec3};

/// Makes content resolvable in the active session.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    /// Loads `content_id`. Loading content that is already resident returns
    /// its existing handle.
    async fn load(&self, content_id: &ContentId) -> Result<ContentHandle, OverlayError>;

    /// Releases previously loaded content.
    async fn unload(&self, handle: ContentHandle);
}

/// The long-running host session.
pub trait HostSession: Send + Sync {
    /// The content the session currently shows, if any.
    fn current_content(&self) -> Option<ContentId>;

    /// The player's position, or `None` when no player instance exists.
    fn player_position(&self) -> Option<Vec3>;

    /// Whether the most recent transition has finished entering its target.
    fn finished_entering(&self) -> bool;

    /// Starts a native host transition. Implementations route the request
    /// through their [`HostEventGuard`](crate::guard::HostEventGuard) first.
    fn begin_transition(&self, transition: TransitionInfo);
}

/// Get/set access to the host fields preserved across an overlay.
pub trait SessionSnapshotStore: Send + Sync {
    /// Reads a field.
    fn get(&self, field: SessionField) -> FieldValue;

    /// Writes a field.
    fn set(&self, field: SessionField, value: FieldValue);
}

/// Coarse on/off switch for player input and animation-driven movement.
pub trait InputControl: Send + Sync {
    /// Stops the player from acting.
    fn suspend_control(&self);

    /// Gives control back to the player.
    fn resume_control(&self);
}

/// Fire-and-forget visual cues. The controller owns all waiting.
pub trait Presentation: Send + Sync {
    /// Starts the entry transition (fade out toward the overlay).
    fn play_entry_transition(&self);

    /// Starts the exit transition (fade out toward the return content).
    fn play_exit_transition(&self);

    /// Fades the reconciled scene in.
    fn fade_in(&self);
}

/// An audio source carried in by overlay content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    /// Handle of the source object.
    pub handle: ObjectHandle,
    /// Name of the routing group the content expects.
    pub group: String,
}

/// Audio routing adapter.
pub trait AudioRouting: Send + Sync {
    /// Routing groups the host mixer exposes.
    fn host_groups(&self) -> Vec<String>;

    /// Audio sources owned by the overlay content.
    fn overlay_sources(&self) -> Vec<AudioSource>;

    /// Routes `source` into the host group named `group`.
    fn route(&self, source: ObjectHandle, group: &str) -> Result<(), OverlayError>;
}

/// Camera adapter.
pub trait CameraRig: Send + Sync {
    /// Moves the camera onto `position` without easing.
    fn snap_to(&self, position: Vec3) -> Result<(), OverlayError>;
}

/// Interaction points and overlay-owned instances living in the session.
pub trait InteractionRegistry: Send + Sync {
    /// Interaction triggers carried in from loaded content that must not be
    /// usable while the overlay is active.
    fn stray_interaction_points(&self) -> Vec<ObjectHandle>;

    /// Enables or disables an interaction point.
    fn set_enabled(&self, handle: ObjectHandle, enabled: bool) -> Result<(), OverlayError>;

    /// Overlay-owned instances that escaped into persistent object space.
    fn leftover_instances(&self) -> Vec<ObjectHandle>;

    /// Destroys an instance.
    fn destroy(&self, handle: ObjectHandle);
}

/// Narrow read-only view of the controller offered to other host systems.
pub trait OverlayQuery: Send + Sync {
    /// Whether an overlay is currently active.
    fn is_active(&self) -> bool;
}

/// Every collaborator the overlay controller is wired to.
#[derive(Clone)]
pub struct OverlayPorts {
    /// Content loader.
    pub loader: Arc<dyn ContentLoader>,
    /// The host session.
    pub host: Arc<dyn HostSession>,
    /// Snapshot field access.
    pub store: Arc<dyn SessionSnapshotStore>,
    /// Player input switch.
    pub input: Arc<dyn InputControl>,
    /// Visual cues.
    pub presentation: Arc<dyn Presentation>,
    /// Audio routing adapter.
    pub audio: Arc<dyn AudioRouting>,
    /// Camera adapter.
    pub camera: Arc<dyn CameraRig>,
    /// Interaction and instance adapter.
    pub interactions: Arc<dyn InteractionRegistry>,
    /// The host transition guard the controller hooks into.
    pub guard: Arc<HostEventGuard>,
    /// Lifecycle event sink.
    pub events: Arc<dyn LifecycleEventSink>,
}

impl std::fmt::Debug for OverlayPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPorts")
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}
