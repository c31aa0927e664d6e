//! Shared test doubles for the Waygate overlay controller.

mod adapters;
mod clock;
mod host;
mod input;
mod loader;
mod rig;
mod store;

pub use adapters::{
    RecordingCamera, RecordingPresentation, ScriptedAudioRouting, ScriptedInteractionRegistry,
};
pub use clock::FixedClock;
pub use host::InMemoryHost;
pub use input::RecordingInputControl;
pub use loader::{LoadBehavior, ScriptedContentLoader};
pub use rig::TestRig;
pub use store::InMemorySnapshotStore;
