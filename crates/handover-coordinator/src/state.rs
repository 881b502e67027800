//! Coordinator state machine
//!
//! The coordinator's state is a set of overlapping flags plus two in-flight
//! counters. Every mutation goes through [`CoordinatorState::apply`], which
//! enforces the guards (check-then-set in one step) and rejects any transition
//! whose result would break an invariant:
//!
//! - `is_update_available == need_refresh`
//! - a reload is only scheduled while an activation is in progress
//! - `has_applied_reload` implies a reload was scheduled, and never reverts
//! - after the reload, only observational flags may change
//!
//! The conceptual phase (`Idle → CheckPending → DecidingVersion →
//! WaitingDetected/ReadyToApply → Activating → ReloadPending → Reloaded`) is
//! derived from the flags by [`CoordinatorState::phase`], so the two readings
//! can never disagree.

use serde::{Deserialize, Serialize};

/// Conceptual coordinator phase, derived from the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdatePhase {
    /// Nothing in flight
    Idle,
    /// A probe-gated check or registration re-poll is in flight
    CheckPending,
    /// The decision policy is comparing versions for a refresh signal
    DecidingVersion,
    /// An update is waiting but the user is away (the dormant track)
    WaitingDetected,
    /// An update is waiting and will be applied once the app has booted
    ReadyToApply,
    /// The waiting worker is being activated
    Activating,
    /// Control has changed; the reload waits for boot readiness
    ReloadPending,
    /// The page reload has been issued (terminal)
    Reloaded,
}

/// Reason a transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRejected {
    /// An activation is already in progress
    #[error("an activation is already in progress")]
    ActivationInProgress,
    /// The latch guarding this loop is already held
    #[error("already scheduled")]
    AlreadyScheduled,
    /// The transition requires an activation in progress
    #[error("no activation in progress")]
    NotUpdating,
    /// The page has already been reloaded
    #[error("reload already applied")]
    AlreadyReloaded,
    /// The resulting flag combination is illegal
    #[error("invariant violated: {0}")]
    InvariantViolated(&'static str),
}

/// Single flag override, only reachable through the test-hook surface
#[cfg(feature = "test-hooks")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOverride {
    /// Sets `need_refresh` and its `is_update_available` mirror
    NeedRefresh(bool),
    /// Sets `is_updating`
    Updating(bool),
    /// Sets `is_user_active`
    UserActive(bool),
    /// Sets `pending_auto_update`
    PendingAutoUpdate(bool),
    /// Sets `offline_ready`
    OfflineReady(bool),
    /// Sets the auto-apply scheduling latch
    AutoUpdateScheduled(bool),
    /// Sets the reload scheduling latch
    ReloadScheduled(bool),
}

/// Every legal state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A probe-gated check or re-poll started
    CheckStarted,
    /// A check finished, whatever its outcome
    CheckFinished,
    /// The policy started deciding on a refresh signal
    DecisionStarted,
    /// The policy finished deciding on a refresh signal
    DecisionFinished,
    /// A real new version is waiting
    RefreshNeeded {
        /// Whether the user is active at detection time
        user_active: bool,
    },
    /// All assets needed offline are cached
    OfflineReady,
    /// Visibility-derived activity changed
    UserActivity {
        /// New activity reading
        active: bool,
    },
    /// Take the auto-apply latch
    AutoApplyScheduled,
    /// Release the auto-apply latch
    AutoApplyReleased,
    /// Consume the pending auto-update (visibility return)
    PendingAutoUpdateCleared,
    /// Take the activation mutex
    ActivationStarted,
    /// The second decision found no real change; clears the refresh flags
    ActivationAborted,
    /// Activation failed; releases the mutex so a later trigger can retry
    ActivationFailed,
    /// The waiting worker was told to take control
    ActivationCommitted,
    /// Take the reload latch after control changed
    ReloadScheduled,
    /// The one and only page reload was issued
    ReloadApplied,
    /// Direct flag setter for automated tests
    #[cfg(feature = "test-hooks")]
    Override(FlagOverride),
}

/// Mutable coordinator state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    need_refresh: bool,
    is_update_available: bool,
    is_updating: bool,
    is_user_active: bool,
    pending_auto_update: bool,
    offline_ready: bool,
    has_applied_reload: bool,
    is_auto_update_scheduled: bool,
    is_reload_scheduled: bool,
    checks_in_flight: u32,
    decisions_in_flight: u32,
}

impl CoordinatorState {
    /// Initial state for a freshly loaded page
    pub fn new(user_active: bool) -> Self {
        Self {
            is_user_active: user_active,
            ..Self::default()
        }
    }

    /// Apply a transition, or leave the state untouched and say why not
    pub fn apply(&mut self, transition: Transition) -> Result<(), TransitionRejected> {
        let mut next = self.clone();
        next.transition(transition)?;
        next.check_invariants(self)?;
        *self = next;
        Ok(())
    }

    fn transition(&mut self, transition: Transition) -> Result<(), TransitionRejected> {
        let observational = matches!(
            transition,
            Transition::UserActivity { .. } | Transition::OfflineReady
        );
        if self.has_applied_reload && !observational {
            return Err(TransitionRejected::AlreadyReloaded);
        }

        match transition {
            Transition::CheckStarted => {
                self.checks_in_flight = self.checks_in_flight.saturating_add(1);
            }
            Transition::CheckFinished => {
                self.checks_in_flight = self.checks_in_flight.saturating_sub(1);
            }
            Transition::DecisionStarted => {
                self.decisions_in_flight = self.decisions_in_flight.saturating_add(1);
            }
            Transition::DecisionFinished => {
                self.decisions_in_flight = self.decisions_in_flight.saturating_sub(1);
            }
            Transition::RefreshNeeded { user_active } => {
                self.need_refresh = true;
                self.is_update_available = true;
                self.is_user_active = user_active;
                self.pending_auto_update = true;
            }
            Transition::OfflineReady => self.offline_ready = true,
            Transition::UserActivity { active } => self.is_user_active = active,
            Transition::AutoApplyScheduled => {
                if self.is_updating {
                    return Err(TransitionRejected::ActivationInProgress);
                }
                if self.is_auto_update_scheduled {
                    return Err(TransitionRejected::AlreadyScheduled);
                }
                self.is_auto_update_scheduled = true;
            }
            Transition::AutoApplyReleased => self.is_auto_update_scheduled = false,
            Transition::PendingAutoUpdateCleared => self.pending_auto_update = false,
            Transition::ActivationStarted => {
                if self.is_updating {
                    return Err(TransitionRejected::ActivationInProgress);
                }
                self.is_updating = true;
            }
            Transition::ActivationFailed => {
                self.require_updating()?;
                self.is_updating = false;
            }
            Transition::ActivationAborted => {
                self.require_updating()?;
                self.is_updating = false;
                self.need_refresh = false;
                self.is_update_available = false;
                self.pending_auto_update = false;
            }
            Transition::ActivationCommitted => self.require_updating()?,
            Transition::ReloadScheduled => {
                self.require_updating()?;
                if self.is_reload_scheduled {
                    return Err(TransitionRejected::AlreadyScheduled);
                }
                self.is_reload_scheduled = true;
            }
            Transition::ReloadApplied => {
                if !self.is_reload_scheduled {
                    return Err(TransitionRejected::InvariantViolated(
                        "reload applied without being scheduled",
                    ));
                }
                self.has_applied_reload = true;
            }
            #[cfg(feature = "test-hooks")]
            Transition::Override(flag) => self.override_flag(flag),
        }
        Ok(())
    }

    #[cfg(feature = "test-hooks")]
    fn override_flag(&mut self, flag: FlagOverride) {
        match flag {
            FlagOverride::NeedRefresh(value) => {
                self.need_refresh = value;
                self.is_update_available = value;
            }
            FlagOverride::Updating(value) => self.is_updating = value,
            FlagOverride::UserActive(value) => self.is_user_active = value,
            FlagOverride::PendingAutoUpdate(value) => self.pending_auto_update = value,
            FlagOverride::OfflineReady(value) => self.offline_ready = value,
            FlagOverride::AutoUpdateScheduled(value) => self.is_auto_update_scheduled = value,
            FlagOverride::ReloadScheduled(value) => self.is_reload_scheduled = value,
        }
    }

    fn require_updating(&self) -> Result<(), TransitionRejected> {
        if self.is_updating {
            Ok(())
        } else {
            Err(TransitionRejected::NotUpdating)
        }
    }

    fn check_invariants(&self, previous: &Self) -> Result<(), TransitionRejected> {
        if self.is_update_available != self.need_refresh {
            return Err(TransitionRejected::InvariantViolated(
                "is_update_available must mirror need_refresh",
            ));
        }
        if self.is_reload_scheduled && !self.is_updating {
            return Err(TransitionRejected::InvariantViolated(
                "reload scheduled without an activation in progress",
            ));
        }
        if self.has_applied_reload && !self.is_reload_scheduled {
            return Err(TransitionRejected::InvariantViolated(
                "reload applied without being scheduled",
            ));
        }
        if previous.has_applied_reload && !self.has_applied_reload {
            return Err(TransitionRejected::InvariantViolated(
                "has_applied_reload never reverts",
            ));
        }
        Ok(())
    }

    /// Derived conceptual phase
    pub fn phase(&self) -> UpdatePhase {
        if self.has_applied_reload {
            UpdatePhase::Reloaded
        } else if self.is_reload_scheduled {
            UpdatePhase::ReloadPending
        } else if self.is_updating {
            UpdatePhase::Activating
        } else if self.need_refresh && !self.is_user_active {
            UpdatePhase::WaitingDetected
        } else if self.need_refresh {
            UpdatePhase::ReadyToApply
        } else if self.decisions_in_flight > 0 {
            UpdatePhase::DecidingVersion
        } else if self.checks_in_flight > 0 {
            UpdatePhase::CheckPending
        } else {
            UpdatePhase::Idle
        }
    }

    /// An update is held back because the user is away
    pub fn is_dormant(&self) -> bool {
        self.need_refresh && self.pending_auto_update && !self.is_user_active
    }

    /// A new version is known to be waiting
    pub fn need_refresh(&self) -> bool {
        self.need_refresh
    }

    /// Mirror of `need_refresh` exposed to the UI
    pub fn is_update_available(&self) -> bool {
        self.is_update_available
    }

    /// An activation is in progress
    pub fn is_updating(&self) -> bool {
        self.is_updating
    }

    /// The page is the foregrounded, visible tab
    pub fn is_user_active(&self) -> bool {
        self.is_user_active
    }

    /// Apply automatically once the user returns
    pub fn pending_auto_update(&self) -> bool {
        self.pending_auto_update
    }

    /// All assets required offline are cached
    pub fn offline_ready(&self) -> bool {
        self.offline_ready
    }

    /// The reload has been issued
    pub fn has_applied_reload(&self) -> bool {
        self.has_applied_reload
    }

    /// The auto-apply loop latch is held
    pub fn is_auto_update_scheduled(&self) -> bool {
        self.is_auto_update_scheduled
    }

    /// The reload loop latch is held
    pub fn is_reload_scheduled(&self) -> bool {
        self.is_reload_scheduled
    }

    /// Visibility return should apply the pending update right away
    pub fn should_apply_on_return(&self) -> bool {
        self.pending_auto_update && self.need_refresh && !self.is_updating
    }

    /// Immutable copy for subscribers
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            phase: self.phase(),
            need_refresh: self.need_refresh,
            is_update_available: self.is_update_available,
            is_updating: self.is_updating,
            is_user_active: self.is_user_active,
            pending_auto_update: self.pending_auto_update,
            offline_ready: self.offline_ready,
            has_applied_reload: self.has_applied_reload,
            dormant: self.is_dormant(),
        }
    }
}

/// UI-facing view of the coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    /// Derived phase
    pub phase: UpdatePhase,
    /// A new version is waiting
    pub need_refresh: bool,
    /// Mirror of `need_refresh` for the update prompt
    pub is_update_available: bool,
    /// An activation is in progress
    pub is_updating: bool,
    /// The page is foregrounded and visible
    pub is_user_active: bool,
    /// Apply once the user returns
    pub pending_auto_update: bool,
    /// Offline assets are cached
    pub offline_ready: bool,
    /// The reload was issued
    pub has_applied_reload: bool,
    /// Waiting for the user to come back
    pub dormant: bool,
}
