//! Overlay orchestration: the lifecycle controller and the pieces it
//! sequences.

pub mod controller;
pub mod interception;
pub mod query_handlers;
pub mod reconciliation;
pub mod sequencing;
