//! Overlay error taxonomy.

use thiserror::Error;

use crate::types::ContentId;

/// Errors surfaced by the overlay controller and its collaborators.
///
/// None of these are fatal to the host process. The controller absorbs
/// them, restores player control and reports them for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The request arrived in the wrong state or while another episode was
    /// in flight. No state was changed.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The content loader reported a failure.
    #[error("failed to load {content_id}: {reason}")]
    LoadFailed {
        /// The content that was being loaded.
        content_id: ContentId,
        /// Loader-provided reason.
        reason: String,
    },

    /// Loading or arrival did not complete within the configured bound.
    #[error("loading {content_id} timed out after {timeout_ms} ms")]
    LoadTimedOut {
        /// The content that was being loaded.
        content_id: ContentId,
        /// The bound that was exceeded.
        timeout_ms: u64,
    },

    /// A session object the operation depends on is absent.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),

    /// A non-fatal reconciliation step failed.
    #[error("reconciliation step failed: {0}")]
    Reconciliation(String),

    /// The episode was superseded (session teardown or interception) while
    /// it was suspended.
    #[error("overlay episode was cancelled")]
    Cancelled,
}
