//! Overlay domain records.

pub mod commands;
pub mod events;
pub mod registry;
pub mod return_context;
pub mod snapshot;
pub mod state;
