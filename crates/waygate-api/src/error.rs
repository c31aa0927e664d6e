//! Waygate API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use waygate_core::error::OverlayError;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `OverlayError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub OverlayError);

impl From<OverlayError> for ApiError {
    fn from(err: OverlayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            OverlayError::Rejected(_) => (StatusCode::CONFLICT, "rejected"),
            OverlayError::MissingCollaborator(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "missing_collaborator")
            }
            OverlayError::LoadFailed { .. } => (StatusCode::SERVICE_UNAVAILABLE, "load_failed"),
            OverlayError::LoadTimedOut { .. } => (StatusCode::GATEWAY_TIMEOUT, "load_timed_out"),
            OverlayError::Reconciliation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "reconciliation_error")
            }
            OverlayError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "cancelled"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
