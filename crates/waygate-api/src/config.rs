//! Server configuration read from the environment.

use std::str::FromStr;

use waygate_overlay::OverlayConfig;

use crate::error::AppError;

/// Everything the binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Overlay timings.
    pub overlay: OverlayConfig,
}

impl ServerConfig {
    /// Reads `HOST`, `PORT` and the `WAYGATE_*` timing variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set but does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = OverlayConfig::default();
        let overlay = OverlayConfig {
            entry_transition_ms: parse_or(
                &lookup,
                "WAYGATE_ENTRY_TRANSITION_MS",
                defaults.entry_transition_ms,
            )?,
            exit_transition_ms: parse_or(
                &lookup,
                "WAYGATE_EXIT_TRANSITION_MS",
                defaults.exit_transition_ms,
            )?,
            load_timeout_ms: parse_or(&lookup, "WAYGATE_LOAD_TIMEOUT_MS", defaults.load_timeout_ms)?,
            arrival_timeout_ms: parse_or(
                &lookup,
                "WAYGATE_ARRIVAL_TIMEOUT_MS",
                defaults.arrival_timeout_ms,
            )?,
            arrival_poll_interval_ms: parse_or(
                &lookup,
                "WAYGATE_POLL_INTERVAL_MS",
                defaults.arrival_poll_interval_ms,
            )?,
            frame_ms: parse_or(&lookup, "WAYGATE_FRAME_MS", defaults.frame_ms)?,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            overlay,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
    }
}
