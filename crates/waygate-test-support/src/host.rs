//! In-memory `HostSession`.

use std::sync::{Arc, Mutex};

use waygate_core::guard::{HostEventGuard, TransitionInfo};
use waygate_core::ports::HostSession;
use waygate_core::types::{ContentId, Vec3};

#[derive(Debug)]
struct HostState {
    current: Option<ContentId>,
    player: Option<Vec3>,
    finished_entering: bool,
    hold_arrivals: bool,
    in_flight: Option<TransitionInfo>,
    transitions: Vec<TransitionInfo>,
}

/// A host session whose transitions run through a real [`HostEventGuard`].
///
/// By default a transition with a target arrives immediately. With
/// [`hold_arrivals`](Self::hold_arrivals) it stays in flight until
/// [`complete_arrival`](Self::complete_arrival) is called.
#[derive(Debug)]
pub struct InMemoryHost {
    guard: Arc<HostEventGuard>,
    state: Mutex<HostState>,
}

impl InMemoryHost {
    /// Creates a host showing `current` with the player at `position`.
    #[must_use]
    pub fn new(guard: Arc<HostEventGuard>, current: ContentId, position: Vec3) -> Self {
        Self {
            guard,
            state: Mutex::new(HostState {
                current: Some(current),
                player: Some(position),
                finished_entering: true,
                hold_arrivals: false,
                in_flight: None,
                transitions: Vec::new(),
            }),
        }
    }

    /// Removes the player instance.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn remove_player(&self) {
        self.state.lock().unwrap().player = None;
    }

    /// Keeps subsequent transitions in flight until completed by the test.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn hold_arrivals(&self) {
        self.state.lock().unwrap().hold_arrivals = true;
    }

    /// Lets transitions arrive immediately again.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn release_arrivals(&self) {
        self.state.lock().unwrap().hold_arrivals = false;
    }

    /// Finishes the in-flight transition, if any. Returns where it arrived.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn complete_arrival(&self) -> Option<ContentId> {
        let mut state = self.state.lock().unwrap();
        let transition = state.in_flight.take()?;
        let target = transition.declared_target()?.clone();
        Self::arrive(&mut state, &target, transition.entry_position);
        Some(target)
    }

    /// Simulates a host-originated transition (death, exit, dialogue
    /// trigger). Returns the effective request after interception.
    pub fn attempt_transition(&self, transition: TransitionInfo) -> TransitionInfo {
        self.run_transition(transition)
    }

    /// Every effective transition the host executed, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn transitions(&self) -> Vec<TransitionInfo> {
        self.state.lock().unwrap().transitions.clone()
    }

    fn arrive(state: &mut HostState, target: &ContentId, position: Option<Vec3>) {
        state.current = Some(target.clone());
        if let (Some(player), Some(position)) = (state.player.as_mut(), position) {
            *player = position;
        }
        state.finished_entering = true;
    }

    fn run_transition(&self, transition: TransitionInfo) -> TransitionInfo {
        // Hooks may call back into the test doubles; the host lock is not held.
        let effective = self.guard.intercept(transition);

        let mut state = self.state.lock().unwrap();
        state.transitions.push(effective.clone());
        if let Some(target) = effective.declared_target().cloned() {
            if state.hold_arrivals {
                state.finished_entering = false;
                state.in_flight = Some(effective.clone());
            } else {
                Self::arrive(&mut state, &target, effective.entry_position);
            }
        }
        effective
    }
}

impl HostSession for InMemoryHost {
    fn current_content(&self) -> Option<ContentId> {
        self.state.lock().unwrap().current.clone()
    }

    fn player_position(&self) -> Option<Vec3> {
        self.state.lock().unwrap().player
    }

    fn finished_entering(&self) -> bool {
        self.state.lock().unwrap().finished_entering
    }

    fn begin_transition(&self, transition: TransitionInfo) {
        self.run_transition(transition);
    }
}
