//! Routes driving the overlay lifecycle.
//!
//! Enter and exit run their whole sequence before responding, so a reply
//! always reflects a settled state.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use waygate_core::event::RecordedEvent;
use waygate_core::guard::TransitionInfo;
use waygate_core::types::{ContentId, Vec3};
use waygate_overlay::OverlayState;
use waygate_overlay::application::query_handlers::{OverlayStatusView, get_overlay_status};
use waygate_overlay::domain::commands::{RequestEnter, RequestExit};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `POST /enter`.
#[derive(Debug, Deserialize)]
pub struct EnterRequest {
    /// Overlay content to open.
    pub content_id: ContentId,
    /// Where the player appears inside the overlay.
    #[serde(default)]
    pub spawn_position: Vec3,
}

/// Request body for `POST /arrival`.
#[derive(Debug, Deserialize)]
pub struct ArrivalRequest {
    /// Content the host reports as now current.
    pub content_id: ContentId,
}

/// Response for commands: the correlation id and the resulting status.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Correlation id of the accepted command.
    pub correlation_id: Uuid,
    /// Controller status after the command settled.
    pub status: OverlayStatusView,
}

/// Response for `POST /host-transition`.
#[derive(Debug, Serialize)]
pub struct HostTransitionResponse {
    /// The request as the host executed it after interception.
    pub effective: TransitionInfo,
    /// Controller state immediately after interception.
    pub state: OverlayState,
}

/// POST /api/v1/overlay/enter
async fn enter(
    State(state): State<AppState>,
    Json(body): Json<EnterRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = RequestEnter::new(body.content_id, body.spawn_position);
    state.controller.request_enter(&command).await?;
    Ok(Json(CommandResponse {
        correlation_id: command.correlation_id,
        status: get_overlay_status(&state.controller),
    }))
}

/// POST /api/v1/overlay/exit
async fn exit(State(state): State<AppState>) -> Result<Json<CommandResponse>, ApiError> {
    let command = RequestExit::new();
    state.controller.request_exit(&command).await?;
    Ok(Json(CommandResponse {
        correlation_id: command.correlation_id,
        status: get_overlay_status(&state.controller),
    }))
}

/// POST /api/v1/overlay/host-transition
///
/// Simulates the host starting a transition of its own (death, door, menu).
async fn host_transition(
    State(state): State<AppState>,
    Json(transition): Json<TransitionInfo>,
) -> Json<HostTransitionResponse> {
    info!(origin = ?transition.origin, "simulated host transition");
    let effective = state.sandbox.attempt_transition(transition);
    Json(HostTransitionResponse {
        effective,
        state: state.controller.state(),
    })
}

/// POST /api/v1/overlay/arrival
async fn arrival(
    State(state): State<AppState>,
    Json(body): Json<ArrivalRequest>,
) -> Json<OverlayStatusView> {
    state.controller.notify_arrival(&body.content_id).await;
    Json(get_overlay_status(&state.controller))
}

/// GET /api/v1/overlay/status
async fn status(State(state): State<AppState>) -> Json<OverlayStatusView> {
    Json(get_overlay_status(&state.controller))
}

/// GET /api/v1/overlay/events
async fn events(State(state): State<AppState>) -> Json<Vec<RecordedEvent>> {
    Json(state.events.events())
}

/// Returns the router for the overlay lifecycle.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enter", post(enter))
        .route("/exit", post(exit))
        .route("/host-transition", post(host_transition))
        .route("/arrival", post(arrival))
        .route("/status", get(status))
        .route("/events", get(events))
}
