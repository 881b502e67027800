//! Test-hook surface
//!
//! Direct flag setters and a manual visibility trigger for automated tests.
//! Compiled only with the `test-hooks` feature; production builds carry no
//! escape hatch. Setters still go through the state machine, so they cannot
//! produce an illegal flag combination.

use crate::coordinator::UpdateCoordinator;
use crate::state::{CoordinatorState, FlagOverride, Transition, TransitionRejected};
use handover_core::Visibility;

/// Debug handle borrowed from a coordinator
#[derive(Debug, Clone, Copy)]
pub struct DebugHooks<'a> {
    coordinator: &'a UpdateCoordinator,
}

impl UpdateCoordinator {
    /// Test-hook handle for this coordinator
    pub fn debug_hooks(&self) -> DebugHooks<'_> {
        DebugHooks { coordinator: self }
    }
}

impl DebugHooks<'_> {
    /// Full state copy
    pub fn state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    /// Set `need_refresh` and its mirror
    pub fn set_need_refresh(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::NeedRefresh(value))
    }

    /// Set `is_updating`
    pub fn set_updating(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::Updating(value))
    }

    /// Set `is_user_active`
    pub fn set_user_active(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::UserActive(value))
    }

    /// Set `pending_auto_update`
    pub fn set_pending_auto_update(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::PendingAutoUpdate(value))
    }

    /// Set `offline_ready`
    pub fn set_offline_ready(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::OfflineReady(value))
    }

    /// Set the auto-apply latch
    pub fn set_auto_update_scheduled(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::AutoUpdateScheduled(value))
    }

    /// Set the reload latch
    pub fn set_reload_scheduled(&self, value: bool) -> Result<(), TransitionRejected> {
        self.set(FlagOverride::ReloadScheduled(value))
    }

    /// Override visibility and run the visibility-change handler
    pub async fn trigger_visibility_change(&self, visibility: Visibility) {
        tracing::debug!(?visibility, "Simulated visibility change");
        self.coordinator
            .tracker()
            .set_visibility_override(Some(visibility));
        self.coordinator.on_visibility_change().await;
    }

    /// Drop the visibility override
    pub fn clear_visibility_override(&self) {
        self.coordinator.tracker().set_visibility_override(None);
    }

    fn set(&self, flag: FlagOverride) -> Result<(), TransitionRejected> {
        self.coordinator.transition(Transition::Override(flag))
    }
}
