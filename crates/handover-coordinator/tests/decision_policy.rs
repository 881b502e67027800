#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_matches::assert_matches;
use handover_coordinator::{
    ApplyOutcome, Decision, BUILD_HASH_KEY, UNVERIFIED_ACTIVATIONS_KEY, UNVERIFIED_BUILD_KEY,
};
use handover_core::StorageEffects;
use handover_effects::{FilesystemStorageHandler, MemoryStorageHandler};
use handover_testkit::{CoordinatorHarness, ReplyBehavior};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn should_apply(running: &str, waiting: &str) -> bool {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        let harness = CoordinatorHarness::builder()
            .build_hash(running)
            .waiting(ReplyBehavior::reply(waiting))
            .build();
        harness.initialize().await;
        harness.coordinator.policy().should_apply_update().await
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_equal_hashes_skip_activation(hash in "[a-f0-9]{7,40}") {
        prop_assert!(!should_apply(&hash, &hash));
    }

    #[test]
    fn prop_unequal_hashes_activate(running in "[a-f0-9]{7,12}", waiting in "[a-f0-9]{7,12}") {
        prop_assume!(running != waiting);
        prop_assert!(should_apply(&running, &waiting));
    }
}

#[tokio::test(start_paused = true)]
async fn test_handshake_timeout_is_permissive_within_bound() {
    let harness = CoordinatorHarness::builder()
        .build_hash("running")
        .waiting(ReplyBehavior::Silent)
        .build();
    harness.initialize().await;

    let start = tokio::time::Instant::now();
    let decision = harness.coordinator.policy().decide().await;
    let elapsed = start.elapsed();

    assert_matches!(decision, Decision::Unverified { waiting: None, .. });
    assert!(decision.should_apply());
    assert!(elapsed >= Duration::from_millis(1_500));
    assert!(elapsed < Duration::from_millis(1_600));
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_counts_as_unknown() {
    let harness = CoordinatorHarness::builder()
        .build_hash("running")
        .waiting(ReplyBehavior::Delayed {
            ms: 2_000,
            hash: "running".to_string(),
        })
        .build();
    harness.initialize().await;
    assert!(harness.coordinator.policy().should_apply_update().await);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_reply_counts_as_unknown() {
    let harness = CoordinatorHarness::builder()
        .build_hash("running")
        .waiting(ReplyBehavior::Malformed)
        .build();
    harness.initialize().await;
    assert_matches!(
        harness.coordinator.policy().decide().await,
        Decision::Unverified { .. }
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_compiled_hash_uses_persisted_copy() {
    let storage = MemoryStorageHandler::with_entries([(BUILD_HASH_KEY, "abc123")]);
    let harness = CoordinatorHarness::builder()
        .build_hash("")
        .waiting(ReplyBehavior::reply("abc123"))
        .storage(storage)
        .build();
    harness.initialize().await;
    assert!(!harness.coordinator.policy().should_apply_update().await);
}

#[tokio::test]
async fn test_initialize_confirms_running_build() {
    let harness = CoordinatorHarness::builder().build_hash("abc123").build();
    harness.initialize().await;

    assert_eq!(
        harness.storage.retrieve(BUILD_HASH_KEY).await.unwrap().as_deref(),
        Some("abc123")
    );
    assert_eq!(harness.registrar.registration_count(), 1);
    assert!(harness.coordinator.registration().is_registered());
}

fn page(
    build_hash: &str,
    waiting: ReplyBehavior,
    storage: &MemoryStorageHandler,
) -> CoordinatorHarness {
    CoordinatorHarness::builder()
        .build_hash(build_hash)
        .waiting(waiting)
        .storage(storage.clone())
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_distinct_builds_keep_activating_without_compiled_hash() {
    let storage = MemoryStorageHandler::new();

    // Each iteration is one deploy and one page lifetime sharing durable storage.
    for deploy in 2..=8 {
        let harness = page("", ReplyBehavior::reply(&format!("b{deploy}")), &storage);
        harness.initialize().await;
        assert!(harness.coordinator.policy().should_apply_update().await);
        assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Activated);
        assert_eq!(harness.worker().unwrap().skip_waiting_count(), 1);
    }
    assert_eq!(
        storage.retrieve(UNVERIFIED_ACTIVATIONS_KEY).await.unwrap().as_deref(),
        Some("1")
    );
}

#[tokio::test(start_paused = true)]
async fn test_silent_worker_always_activates() {
    let storage = MemoryStorageHandler::new();

    for _ in 0..5 {
        let harness = page("running", ReplyBehavior::Silent, &storage);
        harness.initialize().await;
        assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Activated);
    }
    assert_eq!(storage.retrieve(UNVERIFIED_ACTIVATIONS_KEY).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_returning_unverified_build_is_deferred_after_ceiling() {
    let storage = MemoryStorageHandler::new();

    for _ in 0..3 {
        let harness = page("", ReplyBehavior::reply("b2"), &storage);
        harness.initialize().await;
        assert_eq!(harness.coordinator.apply_update().await, ApplyOutcome::Activated);
    }
    assert_eq!(
        storage.retrieve(UNVERIFIED_BUILD_KEY).await.unwrap().as_deref(),
        Some("b2")
    );

    let stuck = page("", ReplyBehavior::reply("b2"), &storage);
    stuck.initialize().await;
    assert_eq!(stuck.coordinator.apply_update().await, ApplyOutcome::Deferred);
    assert_eq!(stuck.worker().unwrap().skip_waiting_count(), 0);
    assert!(!stuck.coordinator.state().is_updating());

    let next = page("", ReplyBehavior::reply("b3"), &storage);
    next.initialize().await;
    assert_eq!(next.coordinator.apply_update().await, ApplyOutcome::Activated);

    let verified = page("running", ReplyBehavior::reply("b4"), &storage);
    verified.initialize().await;
    assert_eq!(verified.coordinator.apply_update().await, ApplyOutcome::Activated);
    assert_eq!(storage.retrieve(UNVERIFIED_BUILD_KEY).await.unwrap(), None);
    assert_eq!(storage.retrieve(UNVERIFIED_ACTIVATIONS_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_confirmed_hash_survives_reload_in_durable_storage() {
    let dir = tempfile::tempdir().unwrap();
    let first = CoordinatorHarness::builder()
        .build_hash("abc123")
        .durable_storage(Arc::new(FilesystemStorageHandler::new(dir.path()).unwrap()))
        .build();
    first.initialize().await;

    let reloaded = CoordinatorHarness::builder()
        .build_hash("")
        .waiting(ReplyBehavior::reply("abc123"))
        .durable_storage(Arc::new(FilesystemStorageHandler::new(dir.path()).unwrap()))
        .build();
    reloaded.initialize().await;
    assert!(!reloaded.coordinator.policy().should_apply_update().await);
}
