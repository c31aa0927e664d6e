//! Controller timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Durations governing each suspension point of an overlay episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Length of the entry transition animation.
    pub entry_transition_ms: u64,
    /// Length of the exit transition animation.
    pub exit_transition_ms: u64,
    /// Bound on loading the overlay content and arriving in it.
    pub load_timeout_ms: u64,
    /// Bound on waiting for the host to finish entering the return target.
    pub arrival_timeout_ms: u64,
    /// Interval between arrival polls.
    pub arrival_poll_interval_ms: u64,
    /// One frame, waited before fading the reconciled scene in.
    pub frame_ms: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            entry_transition_ms: 600,
            exit_transition_ms: 600,
            load_timeout_ms: 10_000,
            arrival_timeout_ms: 5_000,
            arrival_poll_interval_ms: 50,
            frame_ms: 16,
        }
    }
}

impl OverlayConfig {
    /// Entry transition duration.
    #[must_use]
    pub fn entry_transition(&self) -> Duration {
        Duration::from_millis(self.entry_transition_ms)
    }

    /// Exit transition duration.
    #[must_use]
    pub fn exit_transition(&self) -> Duration {
        Duration::from_millis(self.exit_transition_ms)
    }

    /// Load-wait bound.
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Return arrival bound.
    #[must_use]
    pub fn arrival_timeout(&self) -> Duration {
        Duration::from_millis(self.arrival_timeout_ms)
    }

    /// Poll interval, never shorter than one millisecond.
    #[must_use]
    pub fn arrival_poll_interval(&self) -> Duration {
        Duration::from_millis(self.arrival_poll_interval_ms.max(1))
    }

    /// One frame.
    #[must_use]
    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: OverlayConfig =
            serde_json::from_value(serde_json::json!({ "load_timeout_ms": 250 })).unwrap();

        assert_eq!(config.load_timeout(), Duration::from_millis(250));
        assert_eq!(config.entry_transition_ms, 600);
        assert_eq!(config.frame_ms, 16);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = OverlayConfig {
            arrival_poll_interval_ms: 0,
            ..OverlayConfig::default()
        };

        assert_eq!(config.arrival_poll_interval(), Duration::from_millis(1));
    }
}
