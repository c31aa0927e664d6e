//! Interception policy for host-originated transitions.
//!
//! The policy is a pure function of the controller state and the attempted
//! transition; the controller applies its verdict.

use waygate_core::guard::{TransitionDecision, TransitionInfo};

use crate::domain::return_context::ReturnContext;
use crate::domain::state::OverlayState;

/// What the controller should do about an attempted host transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptOutcome {
    /// Whether cleanup must run before the transition proceeds.
    pub run_cleanup: bool,
    /// The verdict handed back to the host.
    pub decision: TransitionDecision,
}

impl InterceptOutcome {
    /// Outcome that leaves the transition alone.
    #[must_use]
    pub fn pass_through() -> Self {
        Self {
            run_cleanup: false,
            decision: TransitionDecision::Proceed,
        }
    }
}

/// Decides how to handle `transition` given the controller's state.
///
/// Outside `Active` the overlay has no opinion. While `Active`, cleanup
/// always runs; the target is rewritten to the return content only when the
/// host left it unset. A declared target (a death respawn, say) is kept.
#[must_use]
pub fn intercept_policy(
    state: OverlayState,
    return_context: Option<&ReturnContext>,
    transition: &TransitionInfo,
) -> InterceptOutcome {
    if state != OverlayState::Active {
        return InterceptOutcome::pass_through();
    }

    let decision = match (transition.declared_target(), return_context) {
        (None, Some(context)) if context.is_valid() => {
            TransitionDecision::ProceedWithTarget(context.return_content_id().clone())
        }
        _ => TransitionDecision::Proceed,
    };

    InterceptOutcome {
        run_cleanup: true,
        decision,
    }
}
