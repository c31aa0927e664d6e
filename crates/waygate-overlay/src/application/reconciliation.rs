//! Post-arrival reconciliation of overlay content with the host session.
//!
//! Steps run in a fixed order (interactions, audio, camera) because later
//! steps assume the earlier ones are stable. A failing step is logged and
//! skipped; none of them is required for the overlay to be playable. The
//! frame wait and fade-in that follow are sequenced by the controller.

use tracing::{debug, warn};
use waygate_core::error::OverlayError;
use waygate_core::ports::{AudioRouting, CameraRig, InteractionRegistry, OverlayPorts};
use waygate_core::types::{ObjectHandle, Vec3};

/// A reconciliation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationStep {
    /// Disable interaction triggers carried in from the content.
    DisableStrayInteractions,
    /// Route overlay audio into the host's groups.
    AlignAudioRouting,
    /// Put the camera on the spawn point.
    SyncCamera,
}

impl ReconciliationStep {
    /// Log-friendly name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DisableStrayInteractions => "disable_stray_interactions",
            Self::AlignAudioRouting => "align_audio_routing",
            Self::SyncCamera => "sync_camera",
        }
    }
}

/// What reconciliation did.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    /// Interaction points that were disabled and must be restored later.
    pub disabled: Vec<ObjectHandle>,
    /// Number of audio sources routed into host groups.
    pub routed_sources: usize,
    /// Failures, in the order they happened.
    pub skipped: Vec<(ReconciliationStep, OverlayError)>,
}

impl ReconciliationReport {
    fn skip(&mut self, step: ReconciliationStep, error: OverlayError) {
        warn!(step = step.name(), %error, "reconciliation step failed; continuing");
        self.skipped.push((step, error));
    }

    /// Names of the steps that failed at least once, without repeats.
    #[must_use]
    pub fn skipped_step_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (step, _) in &self.skipped {
            if !names.iter().any(|name| name == step.name()) {
                names.push(step.name().to_owned());
            }
        }
        names
    }
}

/// Runs the scene reconciliation steps against the freshly arrived content.
pub fn reconcile_scene(ports: &OverlayPorts, spawn_position: Vec3) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();
    disable_stray_interactions(ports.interactions.as_ref(), &mut report);
    align_audio_routing(ports.audio.as_ref(), &mut report);
    sync_camera(ports.camera.as_ref(), spawn_position, &mut report);
    debug!(
        disabled = report.disabled.len(),
        routed = report.routed_sources,
        skipped = report.skipped.len(),
        "scene reconciled"
    );
    report
}

fn disable_stray_interactions(
    interactions: &dyn InteractionRegistry,
    report: &mut ReconciliationReport,
) {
    for handle in interactions.stray_interaction_points() {
        match interactions.set_enabled(handle, false) {
            Ok(()) => report.disabled.push(handle),
            Err(error) => report.skip(ReconciliationStep::DisableStrayInteractions, error),
        }
    }
}

/// Finds the host group matching `wanted`, preferring an exact name match.
fn match_group<'a>(host_groups: &'a [String], wanted: &str) -> Option<&'a str> {
    host_groups
        .iter()
        .find(|group| group.as_str() == wanted)
        .or_else(|| {
            host_groups
                .iter()
                .find(|group| group.eq_ignore_ascii_case(wanted))
        })
        .map(String::as_str)
}

fn align_audio_routing(audio: &dyn AudioRouting, report: &mut ReconciliationReport) {
    let host_groups = audio.host_groups();
    for source in audio.overlay_sources() {
        let Some(group) = match_group(&host_groups, &source.group) else {
            report.skip(
                ReconciliationStep::AlignAudioRouting,
                OverlayError::Reconciliation(format!(
                    "no host audio group named {}",
                    source.group
                )),
            );
            continue;
        };
        match audio.route(source.handle, group) {
            Ok(()) => report.routed_sources += 1,
            Err(error) => report.skip(ReconciliationStep::AlignAudioRouting, error),
        }
    }
}

fn sync_camera(camera: &dyn CameraRig, spawn_position: Vec3, report: &mut ReconciliationReport) {
    if let Err(error) = camera.snap_to(spawn_position) {
        report.skip(ReconciliationStep::SyncCamera, error);
    }
}

#[cfg(test)]
mod tests {
    use waygate_core::types::ObjectHandle;
    use waygate_test_support::TestRig;

    use super::*;

    #[test]
    fn test_reconcile_runs_every_step() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.interactions.set_stray([ObjectHandle(1), ObjectHandle(2)]);
        rig.audio.set_host_groups(["Music", "Effects"]);
        rig.audio.add_source(ObjectHandle(10), "Music");
        rig.audio.add_source(ObjectHandle(11), "effects");

        // Act
        let report = reconcile_scene(&rig.ports(), Vec3::new(10.0, 5.0, 0.0));

        // Assert
        assert_eq!(report.disabled, vec![ObjectHandle(1), ObjectHandle(2)]);
        assert!(!rig.interactions.is_enabled(ObjectHandle(1)));
        assert_eq!(report.routed_sources, 2);
        assert_eq!(
            rig.audio.routed(),
            vec![
                (ObjectHandle(10), "Music".to_owned()),
                (ObjectHandle(11), "Effects".to_owned())
            ]
        );
        assert_eq!(rig.camera.snaps(), vec![Vec3::new(10.0, 5.0, 0.0)]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_audio_group_is_skipped_and_later_steps_still_run() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.audio.set_host_groups(["Music"]);
        rig.audio.add_source(ObjectHandle(10), "Ambience");
        rig.audio.add_source(ObjectHandle(11), "Music");

        // Act
        let report = reconcile_scene(&rig.ports(), Vec3::new(1.0, 1.0, 0.0));

        // Assert
        assert_eq!(report.routed_sources, 1);
        assert_eq!(report.skipped_step_names(), vec!["align_audio_routing"]);
        assert_eq!(rig.camera.snaps().len(), 1);
    }

    #[test]
    fn test_camera_failure_is_reported_not_raised() {
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.camera.fail_snaps();

        let report = reconcile_scene(&rig.ports(), Vec3::default());

        assert_eq!(report.skipped_step_names(), vec!["sync_camera"]);
    }
}
