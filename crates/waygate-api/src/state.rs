//! Shared application state.

use std::sync::Arc;

use waygate_core::clock::SystemClock;
use waygate_core::guard::HostEventGuard;
use waygate_core::sink::InMemoryEventSink;
use waygate_core::types::{ContentId, Vec3};
use waygate_overlay::{OverlayConfig, OverlayController};

use crate::sandbox::SandboxHost;

/// Number of lifecycle events kept for `GET /api/v1/overlay/events`.
const EVENT_HISTORY: usize = 512;

/// Content the sandbox session starts in.
pub const SANDBOX_START_CONTENT: &str = "hub";

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The overlay controller for this session.
    pub controller: OverlayController,
    /// The in-process host the controller drives.
    pub sandbox: Arc<SandboxHost>,
    /// Recent lifecycle events.
    pub events: Arc<InMemoryEventSink>,
}

impl AppState {
    /// Create new application state around a fresh sandbox session.
    #[must_use]
    pub fn new(config: OverlayConfig) -> Self {
        let guard = Arc::new(HostEventGuard::new());
        let sandbox = Arc::new(SandboxHost::new(
            guard,
            ContentId::new(SANDBOX_START_CONTENT),
            Vec3::default(),
        ));
        let events = Arc::new(InMemoryEventSink::new(EVENT_HISTORY));
        let controller =
            OverlayController::attach(sandbox.ports(events.clone()), config, Arc::new(SystemClock));

        Self {
            controller,
            sandbox,
            events,
        }
    }
}
