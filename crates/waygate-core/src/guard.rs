//! Instrumented host transition entry point.
//!
//! Hosts call [`HostEventGuard::intercept`] at the top of their native
//! scene-transition routine. Registered hooks run in registration order and
//! may retarget the request; the host then performs the (possibly
//! retargeted) transition itself.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{ContentId, Vec3};

/// Why the host is attempting a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrigin {
    /// Issued by the overlay controller itself.
    Controller,
    /// Player death and respawn.
    Death,
    /// The player walked out through an exit.
    ManualExit,
    /// A dialogue or scripted trigger inside loaded content.
    ContentTrigger,
    /// Anything else.
    Other,
}

/// A transition request as seen by the guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionInfo {
    /// Declared destination. `None` or a blank id means "unset".
    pub target: Option<ContentId>,
    /// Where the player should appear, if the request specifies it.
    pub entry_position: Option<Vec3>,
    /// Who asked for the transition.
    pub origin: TransitionOrigin,
}

impl TransitionInfo {
    /// Builds a request toward `target`.
    #[must_use]
    pub fn to(target: ContentId, origin: TransitionOrigin) -> Self {
        Self {
            target: Some(target),
            entry_position: None,
            origin,
        }
    }

    /// Builds a request with no declared target.
    #[must_use]
    pub fn untargeted(origin: TransitionOrigin) -> Self {
        Self {
            target: None,
            entry_position: None,
            origin,
        }
    }

    /// Sets the entry position.
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.entry_position = Some(position);
        self
    }

    /// Returns the declared target when it is set and not blank.
    #[must_use]
    pub fn declared_target(&self) -> Option<&ContentId> {
        self.target.as_ref().filter(|target| !target.is_blank())
    }
}

/// A hook's verdict on an attempted transition. Transitions always proceed;
/// the host's own machinery performs the move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Let the transition run as requested.
    Proceed,
    /// Let the transition run toward a different target.
    ProceedWithTarget(ContentId),
}

/// A pre-hook on the host transition entry point.
pub trait TransitionHook: Send + Sync {
    /// Called synchronously before the native transition executes.
    fn on_host_transition_attempt(&self, transition: &TransitionInfo) -> TransitionDecision;
}

/// Identifies a registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Host subsystems that can be kept from writing global state while an
/// overlay is being set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSubsystem {
    /// Ambient per-scene updates (lighting, weather, map state).
    AmbientSceneUpdates,
    /// Automatic save writes.
    SaveWrites,
    /// HUD refreshes.
    HudUpdates,
}

/// The instrumented transition entry point plus suppress flags.
#[derive(Default)]
pub struct HostEventGuard {
    hooks: RwLock<Vec<(HookId, Arc<dyn TransitionHook>)>>,
    next_hook_id: Mutex<u64>,
    suppressed: Mutex<BTreeSet<HostSubsystem>>,
}

impl std::fmt::Debug for HostEventGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hooks = self.hooks.read().map(|hooks| hooks.len()).unwrap_or(0);
        f.debug_struct("HostEventGuard")
            .field("hooks", &hooks)
            .field("suppressed", &self.suppressed_subsystems())
            .finish()
    }
}

impl HostEventGuard {
    /// Creates a guard with no hooks and nothing suppressed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-hook. Hooks run in registration order.
    pub fn register(&self, hook: Arc<dyn TransitionHook>) -> HookId {
        let id = {
            let mut next = self
                .next_hook_id
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *next += 1;
            HookId(*next)
        };
        self.hooks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((id, hook));
        id
    }

    /// Removes a hook. Returns `false` when it was not registered.
    pub fn unregister(&self, id: HookId) -> bool {
        let mut hooks = self
            .hooks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() != before
    }

    /// Runs every hook over `transition` and returns the effective request.
    pub fn intercept(&self, mut transition: TransitionInfo) -> TransitionInfo {
        // Clone the list so hooks may register or unregister while running.
        let hooks: Vec<Arc<dyn TransitionHook>> = self
            .hooks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, hook)| Arc::clone(hook))
            .collect();

        for hook in hooks {
            if let TransitionDecision::ProceedWithTarget(target) =
                hook.on_host_transition_attempt(&transition)
            {
                debug!(%target, origin = ?transition.origin, "transition retargeted by hook");
                transition.target = Some(target);
            }
        }
        transition
    }

    /// Raises the suppress flag for `subsystem`.
    pub fn suppress(&self, subsystem: HostSubsystem) {
        match self.suppressed.lock() {
            Ok(mut suppressed) => {
                suppressed.insert(subsystem);
            }
            Err(_) => warn!(?subsystem, "suppress flags poisoned; flag not raised"),
        }
    }

    /// Lowers the suppress flag for `subsystem`.
    pub fn release(&self, subsystem: HostSubsystem) {
        self.suppressed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&subsystem);
    }

    /// Whether `subsystem` is currently kept from writing global state.
    pub fn is_suppressed(&self, subsystem: HostSubsystem) -> bool {
        self.suppressed
            .lock()
            .map(|suppressed| suppressed.contains(&subsystem))
            .unwrap_or(false)
    }

    /// All currently suppressed subsystems.
    pub fn suppressed_subsystems(&self) -> Vec<HostSubsystem> {
        self.suppressed
            .lock()
            .map(|suppressed| suppressed.iter().copied().collect())
            .unwrap_or_default()
    }
}
