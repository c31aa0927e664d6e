//! End-to-end lifecycle tests for the overlay controller.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use waygate_core::error::OverlayError;
use waygate_core::guard::{TransitionInfo, TransitionOrigin};
use waygate_core::ports::{HostSession, SessionSnapshotStore};
use waygate_core::types::{ContentId, FieldValue, ObjectHandle, SessionField, Vec3};
use waygate_overlay::domain::commands::{RequestEnter, RequestExit};
use waygate_overlay::{OverlayConfig, OverlayController, OverlayState};
use waygate_test_support::{FixedClock, LoadBehavior, TestRig};

fn attach(rig: &TestRig) -> OverlayController {
    OverlayController::attach(
        rig.ports(),
        OverlayConfig::default(),
        Arc::new(FixedClock::default()),
    )
}

async fn enter_overlay(rig: &TestRig) -> OverlayController {
    let controller = attach(rig);
    controller
        .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
        .await
        .unwrap();
    assert_eq!(controller.state(), OverlayState::Active);
    controller
}

fn assert_active_implies_valid_context(controller: &OverlayController) {
    if controller.state() == OverlayState::Active {
        assert!(
            controller
                .return_context()
                .is_some_and(|context| context.is_valid()),
            "active overlay without a valid return context"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_concrete_scenario_enter_intercept_and_return() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    let controller = attach(&rig);

    // Act: enter
    controller
        .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
        .await
        .unwrap();

    // Assert: active with the prior location captured
    assert_eq!(controller.state(), OverlayState::Active);
    let context = controller.return_context().unwrap();
    assert_eq!(context.return_content_id(), &ContentId::new("town"));
    assert_eq!(context.return_position(), Vec3::new(4.0, 1.0, 0.0));
    assert_eq!(context.captured_at(), FixedClock::default().0);
    assert!(context.is_valid());
    assert_eq!(rig.host.player_position(), Some(Vec3::new(10.0, 5.0, 0.0)));

    // Act: host-originated transition with an empty target
    let effective = rig.host.attempt_transition(TransitionInfo::to(
        ContentId::new(""),
        TransitionOrigin::ContentTrigger,
    ));

    // Assert: redirected to the prior content, now exiting
    assert_eq!(effective.target, Some(ContentId::new("town")));
    assert_eq!(controller.state(), OverlayState::Exiting);

    // Act: let the return watch observe arrival
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(controller.state(), OverlayState::Idle);
    assert!(!controller.return_context().unwrap().is_valid());
    assert_eq!(
        rig.event_types(),
        vec![
            "overlay.entry_requested",
            "overlay.entered",
            "overlay.intercepted",
            "overlay.returned"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_round_trip_restores_snapshot_fields() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    rig.store
        .set(SessionField::RespawnMarker, FieldValue::Text("bench".into()));
    let before = rig.store.fields();
    let controller = enter_overlay(&rig).await;

    // The overlay content rewrites respawn state while active.
    rig.store
        .set(SessionField::RespawnScene, FieldValue::Text("overlay-1".into()));
    rig.store
        .set(SessionField::RespawnMarker, FieldValue::Text("overlay-door".into()));
    rig.store
        .set(SessionField::HazardRespawnOverride, FieldValue::Flag(true));
    rig.store.set(
        SessionField::Position,
        FieldValue::Position(Vec3::new(10.0, 5.0, 0.0)),
    );

    // Act
    controller.request_exit(&RequestExit::new()).await.unwrap();

    // Assert
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(rig.store.fields(), before);
    assert_eq!(rig.host.current_content(), Some(ContentId::new("town")));
    assert_eq!(rig.input.suspend_count(), rig.input.resume_count());
    assert!(!rig.input.is_suspended());
    assert_eq!(
        rig.presentation.cues(),
        vec!["entry_transition", "fade_in", "exit_transition"]
    );
    assert_eq!(rig.loader.unloads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_episodes_do_not_drift() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    let before = rig.store.fields();
    let controller = attach(&rig);

    for round in 0..3 {
        // Act
        controller
            .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
            .await
            .unwrap();
        rig.store
            .set(SessionField::HazardRespawnOverride, FieldValue::Flag(true));
        controller.request_exit(&RequestExit::new()).await.unwrap();

        // Assert
        assert_eq!(controller.state(), OverlayState::Idle, "round {round}");
        assert_eq!(rig.store.fields(), before, "round {round}");
    }
    assert_eq!(rig.loader.loads().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_second_enter_is_rejected_while_entering_and_active() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader
        .set_behavior(LoadBehavior::Delayed(Duration::from_secs(1)));
    let controller = attach(&rig);
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state(), OverlayState::Entering);

    // Act
    let during_entering = controller
        .request_enter(&RequestEnter::new("overlay-2", (0.0, 0.0, 0.0)))
        .await;

    // Assert
    assert!(matches!(during_entering, Err(OverlayError::Rejected(_))));
    assert_eq!(controller.state(), OverlayState::Entering);

    // Act: the first entry completes; try again while active
    first.await.unwrap().unwrap();
    let during_active = controller
        .request_enter(&RequestEnter::new("overlay-2", (0.0, 0.0, 0.0)))
        .await;

    // Assert
    assert!(matches!(during_active, Err(OverlayError::Rejected(_))));
    assert_eq!(controller.state(), OverlayState::Active);
    assert_eq!(rig.loader.loads(), vec![ContentId::new("overlay-1")]);
    assert_eq!(rig.input.suspend_count(), 1);
    assert_active_implies_valid_context(&controller);
}

#[tokio::test(start_paused = true)]
async fn test_second_enter_is_rejected_while_load_is_pending() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader.set_behavior(LoadBehavior::Never);
    let controller = attach(&rig);
    let first = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        controller.pending_entry().map(|pending| pending.target_content_id),
        Some(ContentId::new("overlay-1"))
    );

    // Act
    let second = controller
        .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
        .await;

    // Assert
    assert!(matches!(second, Err(OverlayError::Rejected(_))));
    let outcome = first.await.unwrap();
    assert!(matches!(outcome, Err(OverlayError::LoadTimedOut { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_load_timeout_returns_to_idle_and_resumes_control_once() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader.set_behavior(LoadBehavior::Never);
    let controller = attach(&rig);
    let config = OverlayConfig::default();
    let started = Instant::now();

    // Act
    let result = controller
        .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
        .await;

    // Assert
    assert_eq!(
        result,
        Err(OverlayError::LoadTimedOut {
            content_id: ContentId::new("overlay-1"),
            timeout_ms: config.load_timeout_ms,
        })
    );
    assert!(started.elapsed() >= config.entry_transition() + config.load_timeout());
    assert_eq!(controller.state(), OverlayState::Idle);
    assert!(controller.pending_entry().is_none());
    assert!(!controller.return_context().unwrap().is_valid());
    assert_eq!(rig.input.suspend_count(), 1);
    assert_eq!(rig.input.resume_count(), 1);
    assert!(rig.guard.suppressed_subsystems().is_empty());

    // Nothing resumes control a second time later on.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(rig.input.resume_count(), 1);
    assert_eq!(
        rig.event_types(),
        vec!["overlay.entry_requested", "overlay.entry_failed"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_host_that_never_arrives_times_out_and_unloads_content() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.host.hold_arrivals();
    let controller = attach(&rig);

    // Act
    let result = controller
        .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
        .await;

    // Assert
    assert!(matches!(result, Err(OverlayError::LoadTimedOut { .. })));
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(rig.loader.unloads().len(), 1);
    assert!(!rig.loader.is_resident(&ContentId::new("overlay-1")));
    assert_eq!(rig.input.resume_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_load_within_timeout_succeeds() {
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader
        .set_behavior(LoadBehavior::Delayed(Duration::from_secs(3)));
    let controller = attach(&rig);

    let result = controller
        .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
        .await;

    assert!(result.is_ok());
    assert_eq!(controller.state(), OverlayState::Active);
    assert_active_implies_valid_context(&controller);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_twice_matches_cleanup_once() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.interactions
        .set_stray([ObjectHandle(1), ObjectHandle(2)]);
    let controller = enter_overlay(&rig).await;
    rig.interactions.add_leftover(ObjectHandle(99));

    // Act
    let first = controller.cleanup();
    let state_after_first = controller.state();
    let destroyed_after_first = rig.interactions.destroyed();
    let second = controller.cleanup();

    // Assert
    assert!(first);
    assert!(!second);
    assert_eq!(controller.state(), state_after_first);
    assert_eq!(controller.state(), OverlayState::Exiting);
    assert_eq!(rig.interactions.destroyed(), destroyed_after_first);
    assert!(rig.interactions.is_enabled(ObjectHandle(1)));
    assert!(rig.interactions.is_enabled(ObjectHandle(2)));
    assert_eq!(controller.disabled_interactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_death_with_declared_target_cleans_up_without_redirect() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    let controller = enter_overlay(&rig).await;
    rig.store
        .set(SessionField::RespawnScene, FieldValue::Text("overlay-1".into()));
    // The overlay's own respawn logic moved the saved position.
    rig.store.set(
        SessionField::Position,
        FieldValue::Position(Vec3::new(2.0, 2.0, 0.0)),
    );

    // Act
    let effective = rig.host.attempt_transition(
        TransitionInfo::to(ContentId::new("bench-room"), TransitionOrigin::Death)
            .at(Vec3::new(2.0, 2.0, 0.0)),
    );

    // Assert
    assert_eq!(effective.target, Some(ContentId::new("bench-room")));
    assert_eq!(controller.state(), OverlayState::Exiting);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(
        rig.store.get(SessionField::RespawnScene),
        FieldValue::Text("town".into())
    );
    // Restoration is all-or-nothing, even after a respawn elsewhere.
    assert_eq!(
        rig.store.get(SessionField::Position),
        FieldValue::Position(Vec3::new(4.0, 1.0, 0.0))
    );
    assert_eq!(rig.host.current_content(), Some(ContentId::new("bench-room")));
}

#[tokio::test(start_paused = true)]
async fn test_host_exit_without_arrival_confirmation_proceeds_after_timeout() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    let controller = enter_overlay(&rig).await;
    rig.host.hold_arrivals();

    // Act
    rig.host
        .attempt_transition(TransitionInfo::untargeted(TransitionOrigin::ManualExit));
    tokio::time::sleep(Duration::from_secs(1)).await;
    let still_exiting = controller.state();
    tokio::time::sleep(OverlayConfig::default().arrival_timeout()).await;

    // Assert
    assert_eq!(still_exiting, OverlayState::Exiting);
    assert_eq!(controller.state(), OverlayState::Idle);
    let returned = rig.events.events().pop().unwrap();
    assert_eq!(returned.event_type, "overlay.returned");
    assert_eq!(returned.payload["Returned"]["arrival_timed_out"], true);
    assert!(!rig.input.is_suspended());
}

#[tokio::test(start_paused = true)]
async fn test_host_transition_during_explicit_exit_is_not_intercepted() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    let controller = enter_overlay(&rig).await;
    let exit = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.request_exit(&RequestExit::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state(), OverlayState::Exiting);

    // Act
    let effective = rig
        .host
        .attempt_transition(TransitionInfo::untargeted(TransitionOrigin::Death));

    // Assert
    assert_eq!(effective.target, None);
    exit.await.unwrap().unwrap();
    assert_eq!(controller.state(), OverlayState::Idle);
    assert!(!rig.event_types().contains(&"overlay.intercepted".to_owned()));
}

#[tokio::test(start_paused = true)]
async fn test_host_transition_while_entering_is_left_alone() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader
        .set_behavior(LoadBehavior::Delayed(Duration::from_secs(1)));
    let controller = attach(&rig);
    let entry = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Act
    let effective = rig
        .host
        .attempt_transition(TransitionInfo::untargeted(TransitionOrigin::Other));

    // Assert
    assert_eq!(effective.target, None);
    assert_eq!(controller.state(), OverlayState::Entering);
    entry.await.unwrap().unwrap();
    assert_eq!(controller.state(), OverlayState::Active);
}

#[tokio::test(start_paused = true)]
async fn test_exit_is_rejected_unless_active() {
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    let controller = attach(&rig);

    let result = controller.request_exit(&RequestExit::new()).await;

    assert!(matches!(result, Err(OverlayError::Rejected(_))));
    assert_eq!(controller.state(), OverlayState::Idle);
    assert!(rig.host.transitions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_reconciliation_step_still_activates() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.audio.set_host_groups(["Music"]);
    rig.audio.add_source(ObjectHandle(5), "Voices");
    rig.camera.fail_snaps();
    let controller = attach(&rig);

    // Act
    let result = controller
        .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
        .await;

    // Assert
    assert!(result.is_ok());
    assert_eq!(controller.state(), OverlayState::Active);
    let entered = rig
        .events
        .events()
        .into_iter()
        .find(|event| event.event_type == "overlay.entered")
        .unwrap();
    assert_eq!(
        entered.payload["Entered"]["skipped_steps"],
        serde_json::json!(["align_audio_routing", "sync_camera"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_setup_suppresses_ambient_updates_until_fade_in() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader
        .set_behavior(LoadBehavior::Delayed(Duration::from_secs(2)));
    let controller = attach(&rig);
    let entry = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
                .await
        })
    };

    // Act
    tokio::time::sleep(Duration::from_secs(1)).await;
    let during_load = rig.guard.suppressed_subsystems();
    entry.await.unwrap().unwrap();

    // Assert
    assert!(!during_load.is_empty());
    assert!(rig.guard.suppressed_subsystems().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interception_before_fade_in_resumes_control_once() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    let controller = attach(&rig);
    let entry = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (10.0, 5.0, 0.0)))
                .await
        })
    };
    // Past the entry transition, inside the settle frame before fade-in.
    tokio::time::sleep(Duration::from_millis(605)).await;
    assert_eq!(controller.state(), OverlayState::Active);

    // Act
    let effective =
        rig.host
            .attempt_transition(TransitionInfo::untargeted(TransitionOrigin::Death));
    let outcome = entry.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(effective.target, Some(ContentId::new("town")));
    assert_eq!(outcome, Ok(()));
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(rig.input.suspend_count(), 1);
    assert_eq!(rig.input.resume_count(), 1);
    assert!(rig.guard.suppressed_subsystems().is_empty());
    assert!(!rig.presentation.cues().contains(&"fade_in"));
    assert_eq!(
        rig.event_types(),
        vec![
            "overlay.entry_requested",
            "overlay.intercepted",
            "overlay.returned"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_entry_cancels_without_waiting_for_timeout() {
    // Arrange
    let rig = TestRig::new("town", (0.0, 0.0, 0.0));
    rig.loader.set_behavior(LoadBehavior::Never);
    let controller = attach(&rig);
    let started = Instant::now();
    let entry = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .request_enter(&RequestEnter::new("overlay-1", (0.0, 0.0, 0.0)))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(controller.pending_entry().is_some());

    // Act
    controller.shutdown().await;
    let outcome = entry.await.unwrap();

    // Assert
    assert_eq!(outcome, Err(OverlayError::Cancelled));
    assert!(started.elapsed() < OverlayConfig::default().load_timeout());
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(rig.input.suspend_count(), 1);
    assert_eq!(rig.input.resume_count(), 1);
    assert!(!rig.input.is_suspended());
    assert!(rig.guard.suppressed_subsystems().is_empty());
    assert!(
        !rig.event_types()
            .iter()
            .any(|event_type| event_type == "overlay.entry_failed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_respawn_inside_overlay_keeps_content_loaded() {
    // Arrange
    let rig = TestRig::new("town", (4.0, 1.0, 0.0));
    let controller = enter_overlay(&rig).await;

    // Act
    let effective = rig.host.attempt_transition(TransitionInfo::to(
        ContentId::new("overlay-1"),
        TransitionOrigin::Death,
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Assert
    assert_eq!(effective.target, Some(ContentId::new("overlay-1")));
    assert_eq!(controller.state(), OverlayState::Idle);
    assert_eq!(rig.host.current_content(), Some(ContentId::new("overlay-1")));
    assert!(rig.loader.is_resident(&ContentId::new("overlay-1")));
    assert!(rig.loader.unloads().is_empty());
}
