//! Wall-clock abstraction used to stamp return contexts and lifecycle events.
//!
//! Suspension-point timing (transition waits, load timeouts) runs on the
//! async runtime's timer instead, so tests can pause it independently.

use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
