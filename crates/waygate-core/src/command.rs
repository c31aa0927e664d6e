//! Command abstractions.

use uuid::Uuid;

/// Trait implemented by every request issued to the overlay controller.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the lifecycle events it
    /// produces.
    fn correlation_id(&self) -> Uuid;
}
