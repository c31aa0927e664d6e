//! The overlay lifecycle controller.
//!
//! One controller exists per host session. It owns the overlay state, the
//! return context, the pending entry and the disabled-interaction registry;
//! collaborators only see [`OverlayQuery::is_active`].
//!
//! Entry and exit are explicit async pipelines built from the named
//! suspension points in [`sequencing`]. Shared state sits behind a mutex
//! that is never held across a suspension point, so the interception hook
//! can run between any two of them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use waygate_core::clock::Clock;
use waygate_core::command::Command;
use waygate_core::error::OverlayError;
use waygate_core::event::{EventMetadata, RecordedEvent};
use waygate_core::guard::{
    HookId, HostSubsystem, TransitionDecision, TransitionHook, TransitionInfo, TransitionOrigin,
};
use waygate_core::ports::{OverlayPorts, OverlayQuery};
use waygate_core::types::{ContentHandle, ContentId, ObjectHandle, Vec3};

use crate::application::interception::intercept_policy;
use crate::application::reconciliation::reconcile_scene;
use crate::application::sequencing::{self, SuspensionPoint};
use crate::config::OverlayConfig;
use crate::domain::commands::{RequestEnter, RequestExit};
use crate::domain::events::{
    Entered, EntryFailed, EntryRequested, ExitRequested, Intercepted, OverlayEvent,
    OverlayEventKind, Returned,
};
use crate::domain::registry::DisabledInteractions;
use crate::domain::return_context::ReturnContext;
use crate::domain::snapshot::SessionFieldSnapshot;
use crate::domain::state::{OverlayState, PendingEntry};

/// Subsystems kept quiet between the load request and the fade-in.
const SETUP_SUPPRESSED: [HostSubsystem; 2] =
    [HostSubsystem::AmbientSceneUpdates, HostSubsystem::SaveWrites];

/// One enter/exit round.
#[derive(Debug, Clone)]
struct Episode {
    id: Uuid,
    correlation_id: Uuid,
    content_id: ContentId,
    spawn_position: Vec3,
    handle: Option<ContentHandle>,
}

/// Everything the controller owns exclusively.
#[derive(Debug, Default)]
pub(crate) struct ControllerState {
    pub(crate) overlay: OverlayState,
    pub(crate) return_context: Option<ReturnContext>,
    pub(crate) pending_entry: Option<PendingEntry>,
    pub(crate) disabled: DisabledInteractions,
    episode: Option<Episode>,
    field_snapshot: Option<SessionFieldSnapshot>,
    /// Target a return is waiting to arrive at while `Exiting`.
    exit_target: Option<ContentId>,
    /// Arrival reported by the host through [`OverlayController::notify_arrival`].
    reported_arrival: Option<ContentId>,
    control_suspended: bool,
    setup_suppressed: bool,
    sequence: i64,
    shut_down: bool,
}

impl ControllerState {
    fn is_episode(&self, episode_id: Uuid) -> bool {
        self.episode.as_ref().is_some_and(|episode| episode.id == episode_id)
    }

    pub(crate) fn episode_id(&self) -> Option<Uuid> {
        self.episode.as_ref().map(|episode| episode.id)
    }

    fn stage(&mut self, clock: &dyn Clock, kind: OverlayEventKind) -> OverlayEvent {
        self.sequence += 1;
        let (episode_id, correlation_id) = self
            .episode
            .as_ref()
            .map_or((Uuid::nil(), Uuid::nil()), |episode| {
                (episode.id, episode.correlation_id)
            });
        OverlayEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                episode_id,
                sequence_number: self.sequence,
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        }
    }
}

struct Inner {
    ports: OverlayPorts,
    config: OverlayConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<ControllerState>,
    hook_id: Mutex<Option<HookId>>,
    /// Flips to `true` once the controller has been shut down.
    shutdown_signal: watch::Sender<bool>,
}

/// Handle to the session's overlay lifecycle controller.
///
/// Clones share the same controller.
#[derive(Clone)]
pub struct OverlayController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OverlayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayController")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Registered on the guard in place of the controller itself, so the guard
/// does not keep a torn-down controller alive.
struct ControllerHook(Weak<Inner>);

impl TransitionHook for ControllerHook {
    fn on_host_transition_attempt(&self, transition: &TransitionInfo) -> TransitionDecision {
        match self.0.upgrade() {
            Some(inner) => OverlayController { inner }.on_host_transition_attempt(transition),
            None => TransitionDecision::Proceed,
        }
    }
}

impl OverlayController {
    /// Creates the controller for a session and registers its interception
    /// hook on `ports.guard`.
    #[must_use]
    pub fn attach(ports: OverlayPorts, config: OverlayConfig, clock: Arc<dyn Clock>) -> Self {
        let controller = Self {
            inner: Arc::new(Inner {
                ports,
                config,
                clock,
                state: Mutex::new(ControllerState::default()),
                hook_id: Mutex::new(None),
                shutdown_signal: watch::Sender::new(false),
            }),
        };
        let hook = Arc::new(ControllerHook(Arc::downgrade(&controller.inner)));
        let id = controller.inner.ports.guard.register(hook);
        *controller
            .inner
            .hook_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
        info!("overlay controller attached");
        controller
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OverlayState {
        self.lock().overlay
    }

    /// The most recently captured return context, valid or not.
    pub fn return_context(&self) -> Option<ReturnContext> {
        self.lock().return_context.clone()
    }

    /// The load currently awaiting arrival, if any.
    pub fn pending_entry(&self) -> Option<PendingEntry> {
        self.lock().pending_entry.clone()
    }

    /// Number of interaction points currently held disabled.
    pub fn disabled_interactions(&self) -> usize {
        self.lock().disabled.len()
    }

    /// The timing configuration.
    pub fn config(&self) -> &OverlayConfig {
        &self.inner.config
    }

    fn emit(&self, event: &OverlayEvent) {
        self.inner
            .ports
            .events
            .record(RecordedEvent::from_event(event));
    }

    fn suspend_control(&self) {
        let newly_suspended = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.control_suspended, true)
        };
        if newly_suspended {
            self.inner.ports.input.suspend_control();
        }
    }

    /// Resumes input if, and only if, the controller suspended it.
    fn resume_control(&self) {
        let was_suspended = std::mem::take(&mut self.lock().control_suspended);
        if was_suspended {
            self.inner.ports.input.resume_control();
        }
    }

    fn raise_setup_suppression(&self) {
        self.lock().setup_suppressed = true;
        for subsystem in SETUP_SUPPRESSED {
            self.inner.ports.guard.suppress(subsystem);
        }
    }

    fn release_setup_suppression(&self) {
        let raised = std::mem::take(&mut self.lock().setup_suppressed);
        if raised {
            for subsystem in SETUP_SUPPRESSED {
                self.inner.ports.guard.release(subsystem);
            }
        }
    }

    /// Resolves once [`Self::shutdown`] has run.
    async fn shutdown_requested(&self) {
        let mut signal = self.inner.shutdown_signal.subscribe();
        // `self` keeps the sender alive, so the wait cannot fail.
        let _ = signal.wait_for(|down| *down).await;
    }

    fn ensure_current(&self, episode_id: Uuid, expected: OverlayState) -> Result<(), OverlayError> {
        let state = self.lock();
        if state.shut_down || !state.is_episode(episode_id) || state.overlay != expected {
            return Err(OverlayError::Cancelled);
        }
        Ok(())
    }

    fn arrived_at(&self, content_id: &ContentId) -> bool {
        let reported = self.lock().reported_arrival.as_ref() == Some(content_id);
        let host = &self.inner.ports.host;
        reported || (host.finished_entering() && host.current_content().as_ref() == Some(content_id))
    }

    /// Moves the session into the overlay content named by `command`.
    ///
    /// Rejected without any state change unless the controller is idle with
    /// no pending entry. Once accepted, the episode ends either `Active` or
    /// back in `Idle` with input restored; the error is returned for
    /// logging only.
    ///
    /// # Errors
    ///
    /// `Rejected` or `MissingCollaborator` when the request is refused,
    /// `LoadFailed`/`LoadTimedOut` when the entry unwound, `Cancelled` when
    /// the session was torn down mid-entry.
    #[instrument(skip(self, command), fields(content_id = %command.content_id, correlation_id = %command.correlation_id))]
    pub async fn request_enter(&self, command: &RequestEnter) -> Result<(), OverlayError> {
        let episode = match self.begin_entry(command) {
            Ok(episode) => episode,
            Err(error) => {
                warn!(command = command.command_type(), %error, "request refused");
                return Err(error);
            }
        };

        // Shutdown already reset every record, so the entry pipeline can be
        // dropped at whichever suspension point it is parked on.
        let outcome = tokio::select! {
            outcome = self.run_entry(&episode) => outcome,
            () = self.shutdown_requested() => Err(OverlayError::Cancelled),
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(OverlayError::Cancelled) => {
                debug!(episode_id = %episode.id, "entry cancelled by shutdown");
                Err(OverlayError::Cancelled)
            }
            Err(error) => {
                self.abort_entry(&episode, &error).await;
                Err(error)
            }
        }
    }

    /// Validates the request and captures the return context. Nothing
    /// before this point suspends, so the capture reflects the true
    /// pre-overlay state.
    fn begin_entry(&self, command: &RequestEnter) -> Result<Episode, OverlayError> {
        if command.content_id.is_blank() {
            return Err(OverlayError::Rejected("content id must not be empty".into()));
        }
        let ports = &self.inner.ports;

        let (episode, event) = {
            let mut state = self.lock();
            if state.shut_down {
                return Err(OverlayError::Rejected("controller has been shut down".into()));
            }
            if state.overlay != OverlayState::Idle {
                return Err(OverlayError::Rejected(format!(
                    "cannot enter while {}",
                    state.overlay
                )));
            }
            if state.pending_entry.is_some() {
                return Err(OverlayError::Rejected("an entry is already pending".into()));
            }

            let return_content = ports.host.current_content().ok_or_else(|| {
                OverlayError::MissingCollaborator("host session has no current content".into())
            })?;
            let return_position = ports.host.player_position().ok_or_else(|| {
                OverlayError::MissingCollaborator("no active player instance".into())
            })?;

            let episode = Episode {
                id: Uuid::new_v4(),
                correlation_id: command.correlation_id,
                content_id: command.content_id.clone(),
                spawn_position: command.spawn_position,
                handle: None,
            };
            state.return_context = Some(ReturnContext::capture(
                return_content.clone(),
                return_position,
                self.inner.clock.now(),
            ));
            state.field_snapshot = Some(SessionFieldSnapshot::capture(ports.store.as_ref()));
            state.overlay = OverlayState::Entering;
            state.reported_arrival = None;
            state.episode = Some(episode.clone());

            let event = state.stage(
                self.inner.clock.as_ref(),
                OverlayEventKind::EntryRequested(EntryRequested {
                    content_id: episode.content_id.clone(),
                    spawn_position: episode.spawn_position,
                    return_content_id: return_content,
                }),
            );
            (episode, event)
        };

        info!(episode_id = %episode.id, "entering overlay");
        self.suspend_control();
        ports.presentation.play_entry_transition();
        self.emit(&event);
        Ok(episode)
    }

    async fn run_entry(&self, episode: &Episode) -> Result<(), OverlayError> {
        let config = &self.inner.config;
        sequencing::pause(SuspensionPoint::EntryTransition, config.entry_transition()).await;
        self.ensure_current(episode.id, OverlayState::Entering)?;

        self.lock().pending_entry = Some(PendingEntry::new(episode.content_id.clone(), episode.id));
        self.raise_setup_suppression();

        let load_timeout = config.load_timeout();
        sequencing::bounded(
            SuspensionPoint::ContentLoad,
            load_timeout,
            self.load_and_arrive(episode),
        )
        .await
        .unwrap_or_else(|| {
            Err(OverlayError::LoadTimedOut {
                content_id: episode.content_id.clone(),
                timeout_ms: u64::try_from(load_timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })?;

        self.activate(episode)?;

        let report = reconcile_scene(&self.inner.ports, episode.spawn_position);
        let still_active = {
            let mut state = self.lock();
            let active = state.is_episode(episode.id) && state.overlay == OverlayState::Active;
            if active {
                state.disabled.extend(report.disabled.iter().copied());
            }
            active
        };
        if !still_active {
            // Cleanup already ran for this episode; put back what we just disabled.
            self.reenable(&report.disabled);
            return Ok(());
        }

        sequencing::pause(SuspensionPoint::SceneSettle, config.frame()).await;
        if self.ensure_current(episode.id, OverlayState::Active).is_err() {
            debug!(episode_id = %episode.id, "overlay left before fade-in");
            return Ok(());
        }

        self.inner.ports.presentation.fade_in();
        self.release_setup_suppression();
        self.resume_control();

        let event = self.lock().stage(
            self.inner.clock.as_ref(),
            OverlayEventKind::Entered(Entered {
                content_id: episode.content_id.clone(),
                skipped_steps: report.skipped_step_names(),
            }),
        );
        self.emit(&event);
        info!(episode_id = %episode.id, "overlay active");
        Ok(())
    }

    async fn load_and_arrive(&self, episode: &Episode) -> Result<(), OverlayError> {
        let ports = &self.inner.ports;
        let handle = ports.loader.load(&episode.content_id).await?;

        let recorded = {
            let mut state = self.lock();
            match state.episode.as_mut().filter(|current| current.id == episode.id) {
                Some(current) => {
                    current.handle = Some(handle);
                    true
                }
                None => false,
            }
        };
        if !recorded {
            ports.loader.unload(handle).await;
            return Err(OverlayError::Cancelled);
        }
        self.ensure_current(episode.id, OverlayState::Entering)?;

        debug!(episode_id = %episode.id, "content resident; starting host transition");
        ports.host.begin_transition(
            TransitionInfo::to(episode.content_id.clone(), TransitionOrigin::Controller)
                .at(episode.spawn_position),
        );

        let interval = self.inner.config.arrival_poll_interval();
        loop {
            self.ensure_current(episode.id, OverlayState::Entering)?;
            if self.arrived_at(&episode.content_id) {
                return Ok(());
            }
            sequencing::pause(SuspensionPoint::ArrivalPoll, interval).await;
        }
    }

    fn activate(&self, episode: &Episode) -> Result<(), OverlayError> {
        let mut state = self.lock();
        let awaited = state
            .pending_entry
            .as_ref()
            .is_some_and(|pending| {
                pending.episode_id == episode.id && pending.awaits(&episode.content_id)
            });
        if !awaited || state.overlay != OverlayState::Entering || state.shut_down {
            return Err(OverlayError::Cancelled);
        }
        if !state.return_context.as_ref().is_some_and(ReturnContext::is_valid) {
            return Err(OverlayError::MissingCollaborator(
                "return context was lost during entry".into(),
            ));
        }
        state.pending_entry = None;
        state.reported_arrival = None;
        state.overlay = OverlayState::Active;
        Ok(())
    }

    async fn abort_entry(&self, episode: &Episode, error: &OverlayError) {
        warn!(episode_id = %episode.id, %error, "overlay entry failed; restoring control");
        let (handle, return_context, event) = {
            let mut state = self.lock();
            if !state.is_episode(episode.id) {
                return;
            }
            state.pending_entry = None;
            state.reported_arrival = None;
            state.field_snapshot = None;
            state.overlay = OverlayState::Idle;
            let return_context = state.return_context.clone();
            if let Some(context) = state.return_context.as_mut() {
                context.invalidate();
            }
            let event = state.stage(
                self.inner.clock.as_ref(),
                OverlayEventKind::EntryFailed(EntryFailed {
                    content_id: episode.content_id.clone(),
                    reason: error.to_string(),
                }),
            );
            let handle = state.episode.take().and_then(|current| current.handle);
            (handle, return_context, event)
        };

        // The host may already show the overlay even though arrival was never
        // confirmed; send it back rather than strand the player there.
        let host = &self.inner.ports.host;
        let stranded = host.current_content().as_ref() == Some(&episode.content_id);
        if let Some(context) = return_context.filter(|_| stranded) {
            host.begin_transition(
                TransitionInfo::to(context.return_content_id().clone(), TransitionOrigin::Controller)
                    .at(context.return_position()),
            );
        }

        self.release_setup_suppression();
        self.resume_control();
        self.emit(&event);
        if let Some(handle) = handle {
            self.inner.ports.loader.unload(handle).await;
        }
    }

    /// Leaves the active overlay and returns to the captured context.
    ///
    /// # Errors
    ///
    /// `Rejected` unless the overlay is active with a valid return context.
    #[instrument(skip(self, command), fields(correlation_id = %command.correlation_id))]
    pub async fn request_exit(&self, command: &RequestExit) -> Result<(), OverlayError> {
        let (episode_id, context) = {
            let state = self.lock();
            if state.overlay != OverlayState::Active {
                let error =
                    OverlayError::Rejected(format!("cannot exit while {}", state.overlay));
                warn!(command = command.command_type(), %error, "request refused");
                return Err(error);
            }
            let context = state
                .return_context
                .clone()
                .filter(ReturnContext::is_valid)
                .ok_or_else(|| OverlayError::Rejected("no valid return context".into()))?;
            let episode_id = state
                .episode_id()
                .ok_or_else(|| OverlayError::Rejected("no overlay episode".into()))?;
            (episode_id, context)
        };

        if !self.cleanup() {
            return Err(OverlayError::Rejected("overlay is no longer active".into()));
        }
        let target = context.return_content_id().clone();
        let event = {
            let mut state = self.lock();
            state.exit_target = Some(target.clone());
            state.stage(
                self.inner.clock.as_ref(),
                OverlayEventKind::ExitRequested(ExitRequested {
                    return_content_id: target.clone(),
                }),
            )
        };
        self.emit(&event);
        info!(%episode_id, return_content_id = %target, "exiting overlay");

        self.suspend_control();
        self.inner.ports.presentation.play_exit_transition();
        sequencing::pause(SuspensionPoint::ExitTransition, self.inner.config.exit_transition())
            .await;
        if self.ensure_current(episode_id, OverlayState::Exiting).is_err() {
            return Ok(());
        }

        self.inner.ports.host.begin_transition(
            TransitionInfo::to(target.clone(), TransitionOrigin::Controller)
                .at(context.return_position()),
        );
        self.await_return(episode_id, target).await;
        Ok(())
    }

    /// Resets overlay bookkeeping: re-enables disabled interaction points,
    /// destroys leftover overlay instances and moves `Active` to `Exiting`.
    ///
    /// Does not start a transition; that is the caller's job. Returns
    /// `false` without touching anything unless the overlay is `Active`, so
    /// a second call is a no-op.
    pub fn cleanup(&self) -> bool {
        let restore = {
            let mut state = self.lock();
            if state.overlay != OverlayState::Active {
                return false;
            }
            state.overlay = OverlayState::Exiting;
            state.disabled.drain()
        };

        self.reenable(&restore);
        let interactions = &self.inner.ports.interactions;
        let leftovers = interactions.leftover_instances();
        for handle in &leftovers {
            interactions.destroy(*handle);
        }
        debug!(
            restored = restore.len(),
            destroyed = leftovers.len(),
            "overlay cleanup finished"
        );
        true
    }

    fn reenable(&self, handles: &[ObjectHandle]) {
        for handle in handles {
            if let Err(error) = self.inner.ports.interactions.set_enabled(*handle, true) {
                warn!(?handle, %error, "failed to re-enable interaction point");
            }
        }
    }

    /// The interception hook. Runs synchronously before a host transition.
    ///
    /// Outside `Active` the transition proceeds untouched. While `Active`,
    /// cleanup always runs and an unset target is redirected to the return
    /// content; the host's own machinery then performs the move.
    pub fn on_host_transition_attempt(&self, transition: &TransitionInfo) -> TransitionDecision {
        let (overlay, context) = {
            let state = self.lock();
            (state.overlay, state.return_context.clone())
        };
        let outcome = intercept_policy(overlay, context.as_ref(), transition);
        if !outcome.run_cleanup {
            return outcome.decision;
        }
        if !self.cleanup() {
            // An explicit exit got there first.
            return TransitionDecision::Proceed;
        }

        let declared_target = transition.declared_target().cloned();
        let effective_target = match &outcome.decision {
            TransitionDecision::ProceedWithTarget(target) => Some(target.clone()),
            TransitionDecision::Proceed => declared_target.clone(),
        };

        let (episode_id, event) = {
            let mut state = self.lock();
            state.exit_target.clone_from(&effective_target);
            let event = effective_target.clone().map(|effective_target| {
                state.stage(
                    self.inner.clock.as_ref(),
                    OverlayEventKind::Intercepted(Intercepted {
                        origin: transition.origin,
                        declared_target: declared_target.clone(),
                        effective_target,
                    }),
                )
            });
            (state.episode_id(), event)
        };
        if let Some(event) = &event {
            self.emit(event);
        }
        info!(
            origin = ?transition.origin,
            redirected = matches!(outcome.decision, TransitionDecision::ProceedWithTarget(_)),
            "host transition intercepted"
        );

        match (episode_id, effective_target) {
            (Some(episode_id), Some(target)) => self.spawn_return_watch(episode_id, target),
            _ => warn!("intercepted transition has no usable target; awaiting arrival report"),
        }
        outcome.decision
    }

    fn spawn_return_watch(&self, episode_id: Uuid, target: ContentId) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let controller = self.clone();
                runtime.spawn(async move {
                    controller.await_return(episode_id, target).await;
                });
            }
            Err(_) => {
                warn!(%target, "no async runtime for the return watch; awaiting arrival report");
            }
        }
    }

    /// Polls for arrival at `target`, bounded by the arrival timeout, then
    /// finalizes. On timeout the return is treated as complete.
    async fn await_return(&self, episode_id: Uuid, target: ContentId) {
        let interval = self.inner.config.arrival_poll_interval();
        let arrived = sequencing::bounded(
            SuspensionPoint::ReturnArrival,
            self.inner.config.arrival_timeout(),
            async {
                loop {
                    if self.ensure_current(episode_id, OverlayState::Exiting).is_err()
                        || self.arrived_at(&target)
                    {
                        return;
                    }
                    sequencing::pause(SuspensionPoint::ArrivalPoll, interval).await;
                }
            },
        )
        .await
        .is_some();

        if !arrived {
            warn!(%target, "host did not confirm arrival in time; proceeding anyway");
        }
        self.finalize(episode_id, &target, !arrived).await;
    }

    /// Host-side report that `content_id` became the current content.
    ///
    /// During `Entering` it confirms arrival in the pending overlay; during
    /// `Exiting` it completes the return immediately.
    pub async fn notify_arrival(&self, content_id: &ContentId) {
        let finalize = {
            let mut state = self.lock();
            let overlay = state.overlay;
            match overlay {
                OverlayState::Entering
                    if state
                        .pending_entry
                        .as_ref()
                        .is_some_and(|pending| pending.awaits(content_id)) =>
                {
                    state.reported_arrival = Some(content_id.clone());
                    None
                }
                OverlayState::Exiting
                    if state
                        .exit_target
                        .as_ref()
                        .is_none_or(|target| target == content_id) =>
                {
                    state.episode_id()
                }
                _ => None,
            }
        };
        if let Some(episode_id) = finalize {
            self.finalize(episode_id, content_id, false).await;
        }
    }

    /// Exiting -> Idle. Runs once per episode; later calls are no-ops.
    async fn finalize(&self, episode_id: Uuid, arrived_at: &ContentId, timed_out: bool) {
        let (handle, snapshot, leftovers, event) = {
            let mut state = self.lock();
            if state.overlay != OverlayState::Exiting || !state.is_episode(episode_id) {
                return;
            }
            state.overlay = OverlayState::Idle;
            state.exit_target = None;
            state.reported_arrival = None;

            if let Some(context) = state.return_context.as_mut() {
                context.invalidate();
            }
            let snapshot = state.field_snapshot.take();
            let leftovers = state.disabled.drain();
            let event = state.stage(
                self.inner.clock.as_ref(),
                OverlayEventKind::Returned(Returned {
                    content_id: arrived_at.clone(),
                    arrival_timed_out: timed_out,
                }),
            );
            // A return that lands back inside the overlay (a respawn there)
            // leaves the host showing that content, so it stays loaded.
            let handle = state
                .episode
                .take()
                .filter(|episode| episode.content_id != *arrived_at)
                .and_then(|episode| episode.handle);
            (handle, snapshot, leftovers, event)
        };

        if let Some(snapshot) = snapshot {
            snapshot.restore(self.inner.ports.store.as_ref());
        }
        self.reenable(&leftovers);
        self.release_setup_suppression();
        self.resume_control();
        self.emit(&event);
        info!(%episode_id, content_id = %arrived_at, timed_out, "returned from overlay");

        if let Some(handle) = handle {
            self.inner.ports.loader.unload(handle).await;
        }
    }

    /// Tears the controller down with its session. All records are
    /// discarded regardless of state; input and suppress flags are given
    /// back and the interception hook is removed. An entry still in flight
    /// returns `Cancelled` without waiting for its load.
    pub async fn shutdown(&self) {
        if let Some(id) = self
            .inner
            .hook_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            self.inner.ports.guard.unregister(id);
        }

        let (handle, disabled, previous) = {
            let mut state = self.lock();
            let previous = state.overlay;
            state.shut_down = true;
            state.overlay = OverlayState::Idle;
            state.return_context = None;
            state.pending_entry = None;
            state.field_snapshot = None;
            state.exit_target = None;
            state.reported_arrival = None;
            let disabled = state.disabled.drain();
            let handle = state.episode.take().and_then(|episode| episode.handle);
            (handle, disabled, previous)
        };
        self.inner.shutdown_signal.send_replace(true);

        self.reenable(&disabled);
        self.release_setup_suppression();
        self.resume_control();
        if let Some(handle) = handle {
            self.inner.ports.loader.unload(handle).await;
        }
        info!(%previous, "overlay controller shut down");
    }
}

impl OverlayQuery for OverlayController {
    fn is_active(&self) -> bool {
        self.state() == OverlayState::Active
    }
}

impl TransitionHook for OverlayController {
    fn on_host_transition_attempt(&self, transition: &TransitionInfo) -> TransitionDecision {
        OverlayController::on_host_transition_attempt(self, transition)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use waygate_core::types::{ContentId, ObjectHandle};
    use waygate_test_support::{FixedClock, LoadBehavior, TestRig};

    use super::*;

    fn attach(rig: &TestRig) -> OverlayController {
        OverlayController::attach(
            rig.ports(),
            OverlayConfig::default(),
            Arc::new(FixedClock::default()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_enter_reaches_active_and_resumes_control() {
        // Arrange
        let rig = TestRig::new("town", (4.0, 1.0, 0.0));
        let controller = attach(&rig);

        // Act
        let result = controller
            .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
            .await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(controller.state(), OverlayState::Active);
        assert!(controller.is_active());
        assert!(controller.pending_entry().is_none());
        assert_eq!(rig.input.suspend_count(), 1);
        assert_eq!(rig.input.resume_count(), 1);
        assert!(rig.guard.suppressed_subsystems().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_enter_without_player_is_refused_and_stays_idle() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.host.remove_player();
        let controller = attach(&rig);

        // Act
        let result = controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await;

        // Assert
        assert!(matches!(result, Err(OverlayError::MissingCollaborator(_))));
        assert_eq!(controller.state(), OverlayState::Idle);
        assert!(controller.return_context().is_none());
        assert_eq!(rig.input.suspend_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_content_id_is_rejected() {
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        let controller = attach(&rig);

        let result = controller
            .request_enter(&RequestEnter::new("  ", (0.0, 0.0, 0.0)))
            .await;

        assert!(matches!(result, Err(OverlayError::Rejected(_))));
        assert!(rig.loader.loads().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_unwinds_to_idle_and_invalidates_context() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.loader.set_behavior(LoadBehavior::Fail("bundle missing".into()));
        let controller = attach(&rig);

        // Act
        let result = controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await;

        // Assert
        assert!(matches!(result, Err(OverlayError::LoadFailed { .. })));
        assert_eq!(controller.state(), OverlayState::Idle);
        assert!(!controller.return_context().unwrap().is_valid());
        assert!(controller.pending_entry().is_none());
        assert_eq!(rig.input.resume_count(), 1);
        assert!(rig.guard.suppressed_subsystems().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_is_a_no_op_outside_active() {
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        let controller = attach(&rig);

        assert!(!controller.cleanup());
        assert_eq!(controller.state(), OverlayState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_restores_disabled_interactions_and_destroys_leftovers() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        rig.interactions.set_stray([ObjectHandle(7)]);
        let controller = attach(&rig);
        controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await
            .unwrap();
        rig.interactions.add_leftover(ObjectHandle(40));
        assert_eq!(controller.disabled_interactions(), 1);

        // Act
        let ran = controller.cleanup();

        // Assert
        assert!(ran);
        assert_eq!(controller.state(), OverlayState::Exiting);
        assert!(rig.interactions.is_enabled(ObjectHandle(7)));
        assert_eq!(rig.interactions.destroyed(), vec![ObjectHandle(40)]);
        assert_eq!(controller.disabled_interactions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_arrival_completes_a_return_without_polling() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        let controller = attach(&rig);
        controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await
            .unwrap();
        rig.host.hold_arrivals();
        let decision = controller.on_host_transition_attempt(&TransitionInfo::untargeted(
            TransitionOrigin::ContentTrigger,
        ));
        assert_eq!(
            decision,
            TransitionDecision::ProceedWithTarget(ContentId::new("town"))
        );

        // Act
        controller.notify_arrival(&ContentId::new("town")).await;

        // Assert
        assert_eq!(controller.state(), OverlayState::Idle);
        assert!(!controller.return_context().unwrap().is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_records_and_unregisters_hook() {
        // Arrange
        let rig = TestRig::new("town", (0.0, 0.0, 0.0));
        let controller = attach(&rig);
        controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await
            .unwrap();

        // Act
        controller.shutdown().await;
        let effective = rig
            .guard
            .intercept(TransitionInfo::untargeted(TransitionOrigin::Death));

        // Assert
        assert_eq!(controller.state(), OverlayState::Idle);
        assert!(controller.return_context().is_none());
        assert_eq!(effective.target, None);
        assert_eq!(rig.loader.unloads().len(), 1);
        let refused = controller
            .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
            .await;
        assert!(matches!(refused, Err(OverlayError::Rejected(_))));
    }
}
