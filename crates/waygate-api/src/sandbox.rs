//! In-process host used when no game is attached.
//!
//! Every port is backed by plain in-memory state. Transitions run through
//! the shared [`HostEventGuard`] and arrive immediately, so the controller
//! sees the same interception path a real host would give it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use waygate_core::error::OverlayError;
use waygate_core::guard::{HostEventGuard, TransitionInfo};
use waygate_core::ports::{
    AudioRouting, AudioSource, CameraRig, ContentLoader, HostSession, InputControl,
    InteractionRegistry, OverlayPorts, Presentation, SessionSnapshotStore,
};
use waygate_core::sink::LifecycleEventSink;
use waygate_core::types::{ContentHandle, ContentId, FieldValue, ObjectHandle, SessionField, Vec3};

/// Audio groups every sandbox session exposes.
const HOST_AUDIO_GROUPS: [&str; 3] = ["Master", "Music", "Effects"];

#[derive(Debug)]
struct SandboxState {
    current: ContentId,
    player: Option<Vec3>,
    fields: BTreeMap<SessionField, FieldValue>,
    resident: BTreeMap<ContentId, ContentHandle>,
    unavailable: BTreeSet<ContentId>,
    next_handle: u64,
    input_suspended: bool,
    camera: Option<Vec3>,
}

/// A self-contained host session implementing every overlay port.
#[derive(Debug)]
pub struct SandboxHost {
    guard: Arc<HostEventGuard>,
    state: Mutex<SandboxState>,
}

impl SandboxHost {
    /// Creates a session showing `start` with the player at `position`.
    #[must_use]
    pub fn new(guard: Arc<HostEventGuard>, start: ContentId, position: Vec3) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(SessionField::Position, FieldValue::Position(position));
        fields.insert(
            SessionField::RespawnScene,
            FieldValue::Text(start.as_str().to_owned()),
        );
        Self {
            guard,
            state: Mutex::new(SandboxState {
                current: start,
                player: Some(position),
                fields,
                resident: BTreeMap::new(),
                unavailable: BTreeSet::new(),
                next_handle: 1,
                input_suspended: false,
                camera: None,
            }),
        }
    }

    /// Wires this session into controller ports.
    pub fn ports(self: &Arc<Self>, events: Arc<dyn LifecycleEventSink>) -> OverlayPorts {
        OverlayPorts {
            loader: self.clone(),
            host: self.clone(),
            store: self.clone(),
            input: self.clone(),
            presentation: self.clone(),
            audio: self.clone(),
            camera: self.clone(),
            interactions: self.clone(),
            guard: Arc::clone(&self.guard),
            events,
        }
    }

    /// Makes subsequent loads of `content_id` fail.
    pub fn mark_unavailable(&self, content_id: ContentId) {
        self.lock().unavailable.insert(content_id);
    }

    /// Whether player input is currently suspended.
    pub fn input_suspended(&self) -> bool {
        self.lock().input_suspended
    }

    /// Simulates a host-originated transition. Returns the effective request
    /// after every registered hook has seen it.
    pub fn attempt_transition(&self, transition: TransitionInfo) -> TransitionInfo {
        // Hooks call back into this session; the lock is taken afterwards.
        let effective = self.guard.intercept(transition);
        if let Some(target) = effective.declared_target() {
            let mut state = self.lock();
            state.current = target.clone();
            if let (Some(player), Some(position)) =
                (state.player.as_mut(), effective.entry_position)
            {
                *player = position;
            }
            debug!(%target, "sandbox arrived");
        }
        effective
    }

    fn lock(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContentLoader for SandboxHost {
    async fn load(&self, content_id: &ContentId) -> Result<ContentHandle, OverlayError> {
        let mut state = self.lock();
        if state.unavailable.contains(content_id) {
            return Err(OverlayError::LoadFailed {
                content_id: content_id.clone(),
                reason: "content is not available in this session".into(),
            });
        }
        if let Some(handle) = state.resident.get(content_id) {
            return Ok(*handle);
        }
        let handle = ContentHandle(state.next_handle);
        state.next_handle += 1;
        state.resident.insert(content_id.clone(), handle);
        Ok(handle)
    }

    async fn unload(&self, handle: ContentHandle) {
        self.lock().resident.retain(|_, resident| *resident != handle);
    }
}

impl HostSession for SandboxHost {
    fn current_content(&self) -> Option<ContentId> {
        Some(self.lock().current.clone())
    }

    fn player_position(&self) -> Option<Vec3> {
        self.lock().player
    }

    fn finished_entering(&self) -> bool {
        true
    }

    fn begin_transition(&self, transition: TransitionInfo) {
        self.attempt_transition(transition);
    }
}

impl SessionSnapshotStore for SandboxHost {
    fn get(&self, field: SessionField) -> FieldValue {
        self.lock().fields.get(&field).cloned().unwrap_or_default()
    }

    fn set(&self, field: SessionField, value: FieldValue) {
        self.lock().fields.insert(field, value);
    }
}

impl InputControl for SandboxHost {
    fn suspend_control(&self) {
        self.lock().input_suspended = true;
    }

    fn resume_control(&self) {
        self.lock().input_suspended = false;
    }
}

impl Presentation for SandboxHost {
    fn play_entry_transition(&self) {
        debug!("sandbox cue: entry transition");
    }

    fn play_exit_transition(&self) {
        debug!("sandbox cue: exit transition");
    }

    fn fade_in(&self) {
        debug!("sandbox cue: fade in");
    }
}

impl AudioRouting for SandboxHost {
    fn host_groups(&self) -> Vec<String> {
        HOST_AUDIO_GROUPS.iter().map(ToString::to_string).collect()
    }

    fn overlay_sources(&self) -> Vec<AudioSource> {
        Vec::new()
    }

    fn route(&self, _source: ObjectHandle, _group: &str) -> Result<(), OverlayError> {
        Ok(())
    }
}

impl CameraRig for SandboxHost {
    fn snap_to(&self, position: Vec3) -> Result<(), OverlayError> {
        self.lock().camera = Some(position);
        Ok(())
    }
}

impl InteractionRegistry for SandboxHost {
    fn stray_interaction_points(&self) -> Vec<ObjectHandle> {
        Vec::new()
    }

    fn set_enabled(&self, _handle: ObjectHandle, _enabled: bool) -> Result<(), OverlayError> {
        Ok(())
    }

    fn leftover_instances(&self) -> Vec<ObjectHandle> {
        Vec::new()
    }

    fn destroy(&self, _handle: ObjectHandle) {}
}
