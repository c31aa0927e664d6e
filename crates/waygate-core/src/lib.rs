//! Waygate core: shared abstractions for the overlay controller.
//!
//! This crate defines the value types, collaborator ports and the host
//! transition guard that the overlay lifecycle controller is written
//! against. It contains no orchestration logic.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod guard;
pub mod ports;
pub mod sink;
pub mod types;
