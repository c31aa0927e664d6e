//! Recording `InputControl`.

use std::sync::atomic::{AtomicUsize, Ordering};

use waygate_core::ports::InputControl;

/// Counts suspend and resume calls.
#[derive(Debug, Default)]
pub struct RecordingInputControl {
    suspends: AtomicUsize,
    resumes: AtomicUsize,
}

impl RecordingInputControl {
    /// Number of `suspend_control` calls.
    pub fn suspend_count(&self) -> usize {
        self.suspends.load(Ordering::SeqCst)
    }

    /// Number of `resume_control` calls.
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    /// Whether the player is currently without control.
    pub fn is_suspended(&self) -> bool {
        self.suspend_count() > self.resume_count()
    }
}

impl InputControl for RecordingInputControl {
    fn suspend_control(&self) {
        self.suspends.fetch_add(1, Ordering::SeqCst);
    }

    fn resume_control(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}
