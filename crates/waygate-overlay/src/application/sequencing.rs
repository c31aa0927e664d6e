//! Named suspension points.
//!
//! Every place an overlay episode yields to the scheduler goes through one
//! of these helpers, so each wait carries its own name in the logs and its
//! own bound.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// The places an overlay episode suspends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionPoint {
    /// Waiting out the entry transition animation.
    EntryTransition,
    /// Waiting for the loader and the host to make the overlay current.
    ContentLoad,
    /// Waiting between arrival polls.
    ArrivalPoll,
    /// Waiting one frame for the reconciled scene to settle.
    SceneSettle,
    /// Waiting out the exit transition animation.
    ExitTransition,
    /// Waiting for the host to finish entering the return target.
    ReturnArrival,
}

impl SuspensionPoint {
    /// Log-friendly name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::EntryTransition => "entry_transition",
            Self::ContentLoad => "content_load",
            Self::ArrivalPoll => "arrival_poll",
            Self::SceneSettle => "scene_settle",
            Self::ExitTransition => "exit_transition",
            Self::ReturnArrival => "return_arrival",
        }
    }
}

/// Suspends for a fixed `duration`.
pub async fn pause(point: SuspensionPoint, duration: Duration) {
    debug!(point = point.name(), ?duration, "suspending");
    tokio::time::sleep(duration).await;
}

/// Runs `future` with an upper bound. Returns `None` when the bound expires
/// first; the future is dropped at that point.
pub async fn bounded<F>(point: SuspensionPoint, limit: Duration, future: F) -> Option<F::Output>
where
    F: Future,
{
    if let Ok(output) = tokio::time::timeout(limit, future).await {
        Some(output)
    } else {
        debug!(point = point.name(), ?limit, "suspension point expired");
        None
    }
}
