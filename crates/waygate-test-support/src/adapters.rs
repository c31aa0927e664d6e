//! Recording presentation, audio, camera and interaction adapters.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use waygate_core::error::OverlayError;
use waygate_core::ports::{AudioRouting, AudioSource, CameraRig, InteractionRegistry, Presentation};
use waygate_core::types::{ObjectHandle, Vec3};

/// Records visual cues by name.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    cues: Mutex<Vec<&'static str>>,
}

impl RecordingPresentation {
    /// Cues played so far: `entry_transition`, `exit_transition`, `fade_in`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn cues(&self) -> Vec<&'static str> {
        self.cues.lock().unwrap().clone()
    }

    fn push(&self, cue: &'static str) {
        self.cues.lock().unwrap().push(cue);
    }
}

impl Presentation for RecordingPresentation {
    fn play_entry_transition(&self) {
        self.push("entry_transition");
    }

    fn play_exit_transition(&self) {
        self.push("exit_transition");
    }

    fn fade_in(&self) {
        self.push("fade_in");
    }
}

#[derive(Debug, Default)]
struct AudioState {
    host_groups: Vec<String>,
    sources: Vec<AudioSource>,
    routed: Vec<(ObjectHandle, String)>,
}

/// Audio routing with configurable host groups and overlay sources.
#[derive(Debug, Default)]
pub struct ScriptedAudioRouting {
    state: Mutex<AudioState>,
}

impl ScriptedAudioRouting {
    /// Replaces the host's routing groups.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_host_groups<I, S>(&self, groups: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().unwrap().host_groups = groups.into_iter().map(Into::into).collect();
    }

    /// Adds an overlay audio source expecting `group`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_source(&self, handle: ObjectHandle, group: &str) {
        self.state.lock().unwrap().sources.push(AudioSource {
            handle,
            group: group.to_owned(),
        });
    }

    /// Every successful `route` call, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn routed(&self) -> Vec<(ObjectHandle, String)> {
        self.state.lock().unwrap().routed.clone()
    }
}

impl AudioRouting for ScriptedAudioRouting {
    fn host_groups(&self) -> Vec<String> {
        self.state.lock().unwrap().host_groups.clone()
    }

    fn overlay_sources(&self) -> Vec<AudioSource> {
        self.state.lock().unwrap().sources.clone()
    }

    fn route(&self, source: ObjectHandle, group: &str) -> Result<(), OverlayError> {
        let mut state = self.state.lock().unwrap();
        if !state.host_groups.iter().any(|host| host == group) {
            return Err(OverlayError::Reconciliation(format!("unknown group {group}")));
        }
        state.routed.push((source, group.to_owned()));
        Ok(())
    }
}

/// Camera that records every snap, optionally failing.
#[derive(Debug, Default)]
pub struct RecordingCamera {
    snaps: Mutex<Vec<Vec3>>,
    fail: AtomicBool,
}

impl RecordingCamera {
    /// Makes every subsequent snap fail.
    pub fn fail_snaps(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Successful snap targets, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snaps(&self) -> Vec<Vec3> {
        self.snaps.lock().unwrap().clone()
    }
}

impl CameraRig for RecordingCamera {
    fn snap_to(&self, position: Vec3) -> Result<(), OverlayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(OverlayError::Reconciliation("camera lock zone missing".into()));
        }
        self.snaps.lock().unwrap().push(position);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InteractionState {
    stray: Vec<ObjectHandle>,
    enabled: BTreeMap<ObjectHandle, bool>,
    leftovers: Vec<ObjectHandle>,
    destroyed: Vec<ObjectHandle>,
}

/// Interaction registry with scripted stray points and leftovers.
#[derive(Debug, Default)]
pub struct ScriptedInteractionRegistry {
    state: Mutex<InteractionState>,
}

impl ScriptedInteractionRegistry {
    /// Sets the stray interaction points reported after arrival. They start
    /// enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_stray<I: IntoIterator<Item = ObjectHandle>>(&self, handles: I) {
        let mut state = self.state.lock().unwrap();
        state.stray = handles.into_iter().collect();
        let stray = state.stray.clone();
        for handle in stray {
            state.enabled.insert(handle, true);
        }
    }

    /// Adds an overlay-owned instance that escaped into persistent space.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_leftover(&self, handle: ObjectHandle) {
        self.state.lock().unwrap().leftovers.push(handle);
    }

    /// Whether `handle` is enabled. Unknown handles count as enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_enabled(&self, handle: ObjectHandle) -> bool {
        self.state
            .lock()
            .unwrap()
            .enabled
            .get(&handle)
            .copied()
            .unwrap_or(true)
    }

    /// Destroyed instances, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn destroyed(&self) -> Vec<ObjectHandle> {
        self.state.lock().unwrap().destroyed.clone()
    }
}

impl InteractionRegistry for ScriptedInteractionRegistry {
    fn stray_interaction_points(&self) -> Vec<ObjectHandle> {
        self.state.lock().unwrap().stray.clone()
    }

    fn set_enabled(&self, handle: ObjectHandle, enabled: bool) -> Result<(), OverlayError> {
        self.state.lock().unwrap().enabled.insert(handle, enabled);
        Ok(())
    }

    fn leftover_instances(&self) -> Vec<ObjectHandle> {
        self.state.lock().unwrap().leftovers.clone()
    }

    fn destroy(&self, handle: ObjectHandle) {
        let mut state = self.state.lock().unwrap();
        state.leftovers.retain(|leftover| *leftover != handle);
        state.destroyed.push(handle);
    }
}
