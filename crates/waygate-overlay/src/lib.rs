//! Waygate overlay lifecycle controller.
//!
//! Moves a running session into a dynamically loaded overlay area and back
//! again: captures where to return, hands off to the content loader,
//! reconciles the loaded content with the host session, and intercepts
//! host transitions that fire while the overlay is active.

pub mod application;
pub mod config;
pub mod domain;

pub use application::controller::OverlayController;
pub use config::OverlayConfig;
pub use domain::state::OverlayState;
