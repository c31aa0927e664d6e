//! A fully wired set of test doubles.

use std::sync::Arc;

use waygate_core::guard::HostEventGuard;
use waygate_core::ports::{OverlayPorts, SessionSnapshotStore};
use waygate_core::sink::InMemoryEventSink;
use waygate_core::types::{ContentId, FieldValue, SessionField, Vec3};

use crate::adapters::{
    RecordingCamera, RecordingPresentation, ScriptedAudioRouting, ScriptedInteractionRegistry,
};
use crate::host::InMemoryHost;
use crate::input::RecordingInputControl;
use crate::loader::ScriptedContentLoader;
use crate::store::InMemorySnapshotStore;

/// Every double the controller needs, sharing one guard.
#[derive(Debug)]
pub struct TestRig {
    /// Transition guard shared by host and controller.
    pub guard: Arc<HostEventGuard>,
    /// Host session.
    pub host: Arc<InMemoryHost>,
    /// Content loader, `Ready` by default.
    pub loader: Arc<ScriptedContentLoader>,
    /// Snapshot store, seeded with the start position and respawn scene.
    pub store: Arc<InMemorySnapshotStore>,
    /// Input switch.
    pub input: Arc<RecordingInputControl>,
    /// Visual cues.
    pub presentation: Arc<RecordingPresentation>,
    /// Audio adapter.
    pub audio: Arc<ScriptedAudioRouting>,
    /// Camera adapter.
    pub camera: Arc<RecordingCamera>,
    /// Interaction adapter.
    pub interactions: Arc<ScriptedInteractionRegistry>,
    /// Lifecycle event sink.
    pub events: Arc<InMemoryEventSink>,
}

impl TestRig {
    /// Creates a rig whose host shows `content` with the player at
    /// `position`.
    pub fn new(content: &str, position: impl Into<Vec3>) -> Self {
        let position = position.into();
        let guard = Arc::new(HostEventGuard::new());
        let host = Arc::new(InMemoryHost::new(
            Arc::clone(&guard),
            ContentId::new(content),
            position,
        ));
        let store = Arc::new(InMemorySnapshotStore::default());
        store.set(SessionField::Position, FieldValue::Position(position));
        store.set(SessionField::RespawnScene, FieldValue::Text(content.to_owned()));

        Self {
            guard,
            host,
            loader: Arc::new(ScriptedContentLoader::default()),
            store,
            input: Arc::new(RecordingInputControl::default()),
            presentation: Arc::new(RecordingPresentation::default()),
            audio: Arc::new(ScriptedAudioRouting::default()),
            camera: Arc::new(RecordingCamera::default()),
            interactions: Arc::new(ScriptedInteractionRegistry::default()),
            events: Arc::new(InMemoryEventSink::new(256)),
        }
    }

    /// The doubles as controller ports.
    pub fn ports(&self) -> OverlayPorts {
        OverlayPorts {
            loader: self.loader.clone(),
            host: self.host.clone(),
            store: self.store.clone(),
            input: self.input.clone(),
            presentation: self.presentation.clone(),
            audio: self.audio.clone(),
            camera: self.camera.clone(),
            interactions: self.interactions.clone(),
            guard: Arc::clone(&self.guard),
            events: self.events.clone(),
        }
    }

    /// Types of the recorded lifecycle events, oldest first.
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .events()
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }
}
