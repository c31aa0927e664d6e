//! Read-only views of the overlay controller.

use serde::Serialize;
use uuid::Uuid;
use waygate_core::types::ContentId;

use crate::application::controller::OverlayController;
use crate::domain::return_context::ReturnContext;
use crate::domain::state::OverlayState;

/// Snapshot of the controller for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayStatusView {
    /// Current lifecycle state.
    pub state: OverlayState,
    /// The current episode, if one is in flight or active.
    pub episode_id: Option<Uuid>,
    /// The latest return context, valid or consumed.
    pub return_context: Option<ReturnContext>,
    /// Overlay content awaiting arrival.
    pub pending_entry: Option<ContentId>,
    /// Interaction points currently held disabled.
    pub disabled_interactions: usize,
}

/// Reads the controller's status in one consistent snapshot.
pub fn get_overlay_status(controller: &OverlayController) -> OverlayStatusView {
    let state = controller.lock();
    OverlayStatusView {
        state: state.overlay,
        episode_id: state.episode_id(),
        return_context: state.return_context.clone(),
        pending_entry: state
            .pending_entry
            .as_ref()
            .map(|pending| pending.target_content_id.clone()),
        disabled_interactions: state.disabled.len(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use waygate_test_support::{FixedClock, TestRig};

    use super::*;
    use crate::config::OverlayConfig;
    use crate::domain::commands::RequestEnter;

    #[tokio::test(start_paused = true)]
    async fn test_status_of_idle_controller_is_empty() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        let controller =
            OverlayController::attach(rig.ports(), OverlayConfig::default(), Arc::new(FixedClock::default()));

        // Act
        let view = get_overlay_status(&controller);

        // Assert
        assert_eq!(view.state, OverlayState::Idle);
        assert!(view.episode_id.is_none());
        assert!(view.return_context.is_none());
        assert!(view.pending_entry.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_serializes_active_overlay() {
        // Arrange
        let rig = TestRig::new("town", (4.0, 1.0, 0.0));
        let controller =
            OverlayController::attach(rig.ports(), OverlayConfig::default(), Arc::new(FixedClock::default()));
        controller
            .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
            .await
            .unwrap();

        // Act
        let json = serde_json::to_value(get_overlay_status(&controller)).unwrap();

        // Assert
        assert_eq!(json["state"], "active");
        assert_eq!(json["return_context"]["return_content_id"], "town");
        assert_eq!(json["return_context"]["valid"], true);
        assert!(json["pending_entry"].is_null());
    }
}
