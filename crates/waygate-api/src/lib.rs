//! Waygate API: an HTTP surface over one overlay controller.
//!
//! The controller drives an in-process [`sandbox::SandboxHost`] so the
//! lifecycle can be exercised without a real game host attached.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod routes;
pub mod sandbox;
pub mod state;

/// Builds the application router without the HTTP layers.
pub fn build_router(app_state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/overlay", routes::overlay::router())
        .with_state(app_state)
}

/// Serves the API on `listener` until `shutdown` resolves, then shuts the
/// overlay controller down.
///
/// # Errors
///
/// `AppError::Server` when the listener fails.
pub async fn serve<F>(
    listener: TcpListener,
    app_state: state::AppState,
    shutdown: F,
) -> Result<(), error::AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    // TODO: Replace CorsLayer::permissive() with restricted origins once a real host embeds this.
    let app = build_router(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    app_state.controller.shutdown().await;
    served?;
    Ok(())
}
