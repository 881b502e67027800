#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_matches::assert_matches;
use handover_coordinator::{ApplyOutcome, UpdatePhase};
use handover_testkit::{CoordinatorHarness, ReplyBehavior};

fn pending_update() -> CoordinatorHarness {
    CoordinatorHarness::builder()
        .build_hash("old")
        .waiting(ReplyBehavior::reply("new"))
        .booted(false)
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_repeated_need_refresh_schedules_one_loop() {
    let harness = pending_update();
    harness.initialize().await;
    let coordinator = &harness.coordinator;

    assert!(coordinator.on_need_refresh(false).await);
    assert!(coordinator.state().is_auto_update_scheduled());
    assert!(coordinator.on_need_refresh(false).await);
    assert!(!coordinator.schedule_auto_apply_update());

    // Boot is still pending: nothing has been activated yet.
    harness.advance(2_000).await;
    let worker = harness.worker().unwrap();
    assert_eq!(worker.skip_waiting_count(), 0);
    assert_eq!(coordinator.snapshot().phase, UpdatePhase::ReadyToApply);

    harness.boot.mark_ready();
    harness.advance(10).await;

    assert_eq!(worker.skip_waiting_count(), 1);
    assert_eq!(harness.registration.activation_count(), 1);
    assert!(!coordinator.state().is_auto_update_scheduled());
    assert_eq!(coordinator.snapshot().phase, UpdatePhase::Activating);
}

#[tokio::test(start_paused = true)]
async fn test_redundant_refresh_signal_is_dropped() {
    let harness = CoordinatorHarness::builder()
        .build_hash("same")
        .waiting(ReplyBehavior::reply("same"))
        .build();
    harness.initialize().await;

    assert!(!harness.coordinator.on_need_refresh(false).await);

    let state = harness.coordinator.state();
    assert!(!state.need_refresh());
    assert!(!state.is_auto_update_scheduled());
    harness.advance(1_000).await;
    assert_eq!(harness.worker().unwrap().skip_waiting_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_forced_refresh_skips_first_decision() {
    let harness = CoordinatorHarness::builder()
        .build_hash("same")
        .waiting(ReplyBehavior::reply("same"))
        .booted(false)
        .build();
    harness.initialize().await;

    assert!(harness.coordinator.force_refresh().await);
    let state = harness.coordinator.state();
    assert!(state.need_refresh());
    assert!(state.is_update_available());
    assert!(state.pending_auto_update());
    assert_eq!(harness.worker().unwrap().version_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_decision_aborts_and_clears_flags() {
    let harness = CoordinatorHarness::builder()
        .build_hash("same")
        .waiting(ReplyBehavior::reply("same"))
        .booted(false)
        .build();
    harness.initialize().await;
    harness.coordinator.force_refresh().await;

    assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Unchanged);

    let state = harness.coordinator.state();
    assert!(!state.need_refresh());
    assert!(!state.is_update_available());
    assert!(!state.pending_auto_update());
    assert!(!state.is_updating());
    assert_eq!(harness.worker().unwrap().skip_waiting_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_apply_sends_one_skip_waiting() {
    let harness = CoordinatorHarness::builder()
        .build_hash("old")
        .waiting(ReplyBehavior::Delayed {
            ms: 100,
            hash: "new".to_string(),
        })
        .build();
    harness.initialize().await;
    let coordinator = &harness.coordinator;

    let (first, second) = tokio::join!(coordinator.apply_update(), coordinator.apply_update());

    assert_eq!(first, ApplyOutcome::Activated);
    assert_eq!(second, ApplyOutcome::AlreadyUpdating);
    assert_eq!(harness.worker().unwrap().skip_waiting_count(), 1);
    assert_eq!(harness.worker().unwrap().version_requests(), 1);

    // Still mid-update until control changes hands.
    assert_eq!(coordinator.apply_update().await, ApplyOutcome::AlreadyUpdating);
    assert_eq!(harness.worker().unwrap().skip_waiting_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_activation_failure_resets_and_allows_retry() {
    let harness = CoordinatorHarness::builder()
        .build_hash("old")
        .waiting(ReplyBehavior::reply("new"))
        .build();
    harness.initialize().await;
    harness.registration.fail_activation(true);

    assert_matches!(
        harness.coordinator.apply_update().await,
        ApplyOutcome::Failed(_)
    );
    assert!(!harness.coordinator.state().is_updating());

    harness.registration.fail_activation(false);
    assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Activated);
    assert_eq!(harness.registration.activation_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_skip_waiting_is_reported() {
    let harness = CoordinatorHarness::builder()
        .build_hash("old")
        .waiting(ReplyBehavior::reply("new"))
        .build();
    harness.initialize().await;
    harness.worker().unwrap().fail_skip_waiting(true);

    assert_matches!(
        harness.coordinator.apply_update().await,
        ApplyOutcome::Failed(_)
    );
    assert_eq!(harness.registration.activation_count(), 0);
    assert!(!harness.coordinator.state().is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_apply_without_registration_fails_softly() {
    let harness = pending_update();
    // No initialize(): nothing is registered.
    assert_matches!(
        harness.coordinator.apply_update().await,
        ApplyOutcome::Failed(handover_core::HandoverError::NotRegistered)
    );
    assert!(!harness.coordinator.state().is_updating());
}

#[tokio::test(start_paused = true)]
async fn test_suppressed_activation_has_no_side_effects() {
    let harness = CoordinatorHarness::builder()
        .build_hash("old")
        .waiting(ReplyBehavior::reply("new"))
        .configure(|config| config.suppress_activation = true)
        .build();
    harness.initialize().await;
    let before = harness.coordinator.state();

    assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Suppressed);

    assert_eq!(harness.coordinator.state(), before);
    let worker = harness.worker().unwrap();
    assert_eq!(worker.version_requests(), 0);
    assert_eq!(worker.skip_waiting_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_need_refresh_event_is_policy_gated() {
    let harness = CoordinatorHarness::builder()
        .build_hash("same")
        .waiting(ReplyBehavior::reply("same"))
        .booted(false)
        .build();
    harness.initialize().await;

    harness
        .coordinator
        .handle_event(handover_coordinator::PlatformEvent::NeedRefresh)
        .await;
    assert!(!harness.coordinator.state().need_refresh());
    assert_eq!(harness.worker().unwrap().version_requests(), 1);

    assert!(harness.coordinator.force_refresh().await);
    assert!(harness.coordinator.state().need_refresh());
    assert_eq!(harness.worker().unwrap().version_requests(), 1);
}
