//! Update coordinator
//!
//! Owns the state machine and wires the probe, registration handle, decision
//! policy and activity tracker to the platform's triggers.
//!
//! # Architecture
//!
//! The coordinator:
//! - Drains a typed [`PlatformEvent`] channel in [`UpdateCoordinator::run`]
//! - Re-polls the registration on a fixed interval while visible and online
//! - Mutates its state only through [`CoordinatorState::apply`], under a lock
//!   that is never held across an await point
//! - Spawns the two unbounded boot waits (auto-apply and reload) as tasks
//! - Publishes a [`CoordinatorSnapshot`] to subscribers after every change
//!
//! # Usage
//!
//! ```rust,no_run
//! use handover_coordinator::{BootSignal, CoordinatorConfig, CoordinatorEffects, UpdateCoordinator};
//! # use std::sync::Arc;
//! # async fn example(effects: CoordinatorEffects) -> Result<(), Box<dyn std::error::Error>> {
//! let boot = BootSignal::new();
//! let coordinator = UpdateCoordinator::new(CoordinatorConfig::default(), effects, boot.clone())?;
//! let (events, receiver) = tokio::sync::mpsc::channel(64);
//!
//! coordinator.initialize().await?;
//! tokio::spawn(Arc::clone(&coordinator).run(receiver));
//!
//! // Later, once the app shell has rendered:
//! boot.mark_ready();
//! # drop(events);
//! # Ok(())
//! # }
//! ```

use crate::activity::ActivityTracker;
use crate::boot::BootSignal;
use crate::config::{ConfigError, CoordinatorConfig};
use crate::events::PlatformEvent;
use crate::handshake::HandshakeChannel;
use crate::policy::{Decision, UpdateDecisionPolicy};
use crate::probe::VersionProbe;
use crate::registration::RegistrationSlot;
use crate::state::{CoordinatorSnapshot, CoordinatorState, Transition, TransitionRejected};
use handover_core::effects::{
    HttpEffects, PageEffects, PhysicalTimeEffects, StorageEffects, WorkerRegistrar,
};
use handover_core::{BuildIdentity, HandoverError, HandoverResult, WorkerMessage};
use handover_effects::RealTimeHandler;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

// =============================================================================
// Effects
// =============================================================================

/// Effect handlers the coordinator runs against
#[derive(Clone)]
pub struct CoordinatorEffects {
    /// Clock and sleeps
    pub time: Arc<dyn PhysicalTimeEffects>,
    /// Version probe transport
    pub http: Arc<dyn HttpEffects>,
    /// Durable store for the confirmed build hash and activation counter; must
    /// survive page reloads
    pub storage: Arc<dyn StorageEffects>,
    /// Foreground page
    pub page: Arc<dyn PageEffects>,
    /// Update-worker registrar
    pub registrar: Arc<dyn WorkerRegistrar>,
}

impl CoordinatorEffects {
    /// Bundle platform handlers with the real clock
    pub fn new(
        page: Arc<dyn PageEffects>,
        registrar: Arc<dyn WorkerRegistrar>,
        http: Arc<dyn HttpEffects>,
        storage: Arc<dyn StorageEffects>,
    ) -> Self {
        Self {
            time: Arc::new(RealTimeHandler::new()),
            http,
            storage,
            page,
            registrar,
        }
    }

    /// Replace the time handler
    pub fn with_time(mut self, time: Arc<dyn PhysicalTimeEffects>) -> Self {
        self.time = time;
        self
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a probe-gated update check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// The platform reports no connectivity; nothing was done
    Offline,
    /// The server publishes the running version; the registration was not touched
    UpToDate,
    /// No registration has been captured yet
    NotRegistered,
    /// The registration was asked to re-check the worker script
    Requested,
    /// The registration re-check failed
    Failed(HandoverError),
}

/// Result of an activation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// Another activation holds the mutex
    AlreadyUpdating,
    /// Activation is disabled by configuration
    Suppressed,
    /// The waiting worker carries the running build; refresh flags were cleared
    Unchanged,
    /// The unverified-activation ceiling was reached
    Deferred,
    /// The waiting worker was told to take control
    Activated,
    /// Activation failed; a later trigger may retry
    Failed(HandoverError),
}

// =============================================================================
// Coordinator
// =============================================================================

/// Coordinates detection, activation and reload of new app versions
pub struct UpdateCoordinator {
    config: CoordinatorConfig,
    effects: CoordinatorEffects,
    state: Mutex<CoordinatorState>,
    snapshots: watch::Sender<CoordinatorSnapshot>,
    registration: Arc<RegistrationSlot>,
    probe: VersionProbe,
    policy: UpdateDecisionPolicy,
    tracker: ActivityTracker,
    boot: BootSignal,
}

impl UpdateCoordinator {
    /// Create a coordinator for the compiled-in build
    pub fn new(
        config: CoordinatorConfig,
        effects: CoordinatorEffects,
        boot: BootSignal,
    ) -> Result<Arc<Self>, ConfigError> {
        let identity = BuildIdentity::compiled(config.app_version.clone());
        Self::with_identity(config, identity, effects, boot)
    }

    /// Create a coordinator for an explicit build identity
    pub fn with_identity(
        config: CoordinatorConfig,
        identity: BuildIdentity,
        effects: CoordinatorEffects,
        boot: BootSignal,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let registration = Arc::new(RegistrationSlot::new());
        let handshake = HandshakeChannel::new(
            registration.clone(),
            effects.time.clone(),
            config.handshake_timeout_ms,
        );
        let policy = UpdateDecisionPolicy::new(
            handshake,
            effects.storage.clone(),
            identity,
            config.max_unverified_activations,
        );
        let probe = VersionProbe::new(
            effects.http.clone(),
            effects.time.clone(),
            config.version_url(),
        );
        let tracker = ActivityTracker::new(effects.page.clone());
        let state = CoordinatorState::new(tracker.update_user_active_state());
        let (snapshots, _) = watch::channel(state.snapshot());

        Ok(Arc::new(Self {
            config,
            effects,
            state: Mutex::new(state),
            snapshots,
            registration,
            probe,
            policy,
            tracker,
            boot,
        }))
    }

    /// Confirm the running build and register the update worker.
    ///
    /// Registration happens after yielding once so that the page's own
    /// startup work runs first.
    pub async fn initialize(&self) -> HandoverResult<()> {
        self.policy.confirm_running_build().await;
        tokio::task::yield_now().await;

        match self
            .effects
            .registrar
            .register(&self.config.worker_script_url)
            .await
        {
            Ok(registration) => {
                self.registration.capture(registration);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    script = %self.config.worker_script_url,
                    error = %e,
                    "Update worker registration failed"
                );
                Err(e)
            }
        }
    }

    /// Drain platform events until the sender side closes.
    ///
    /// Also runs the periodic registration re-poll for as long as events flow.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<PlatformEvent>) {
        let poller = self.spawn_periodic_updates();
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        poller.abort();
        tracing::debug!("Platform event channel closed");
    }

    /// Route a single platform event
    pub async fn handle_event(self: &Arc<Self>, event: PlatformEvent) {
        tracing::trace!(event = event.name(), "Platform event");
        match event {
            PlatformEvent::VisibilityChanged(visibility) => {
                self.tracker.observe_visibility(visibility);
                self.on_visibility_change().await;
            }
            PlatformEvent::ConnectivityChanged(online) => {
                if online && self.tracker.visibility().is_visible() {
                    self.check_for_updates_with_probe().await;
                } else {
                    tracing::debug!(online, "Connectivity changed; no check");
                }
            }
            PlatformEvent::PageShow { persisted } => {
                if persisted && self.tracker.device_class().wires_secondary_triggers() {
                    self.check_for_updates_with_probe().await;
                }
            }
            PlatformEvent::FocusGained => {
                if self.tracker.device_class().wires_secondary_triggers() {
                    self.check_for_updates_with_probe().await;
                }
            }
            PlatformEvent::NeedRefresh => {
                self.on_need_refresh(false).await;
            }
            PlatformEvent::OfflineReady => {
                tracing::info!("App is ready to work offline");
                self.transition_logged(Transition::OfflineReady);
            }
            PlatformEvent::Registered(registration) => {
                self.registration.capture(registration);
            }
            PlatformEvent::RegisterError(message) => {
                tracing::error!(error = %message, "Update worker registration failed");
            }
            PlatformEvent::ControllerChanged => {
                self.on_controller_change();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Checks
    // -------------------------------------------------------------------------

    /// Probe the published version and re-check the registration if it differs
    pub async fn check_for_updates_with_probe(&self) -> CheckOutcome {
        if !self.tracker.is_online() {
            tracing::debug!("Offline; skipping update check");
            return CheckOutcome::Offline;
        }

        let tracked = self.transition_logged(Transition::CheckStarted);
        let outcome = self.probe_then_update().await;
        if tracked {
            self.transition_logged(Transition::CheckFinished);
        }
        outcome
    }

    async fn probe_then_update(&self) -> CheckOutcome {
        match self.probe.probe_version().await {
            Some(published) if self.policy.identity().matches_published(&published) => {
                tracing::debug!(version = %published, "Running the published version");
                return CheckOutcome::UpToDate;
            }
            Some(published) => {
                tracing::info!(
                    published = %published,
                    running = %self.policy.identity().app_version(),
                    "Published version differs; checking for a new worker"
                );
            }
            None => {}
        }

        match self.registration.update().await {
            Ok(()) => CheckOutcome::Requested,
            Err(HandoverError::NotRegistered) => {
                tracing::debug!("No registration yet; skipping worker update");
                CheckOutcome::NotRegistered
            }
            Err(e) => {
                tracing::warn!(error = %e, "Worker update check failed");
                CheckOutcome::Failed(e)
            }
        }
    }

    /// Spawn the periodic registration re-poll.
    ///
    /// Runs while the page lives; each tick only acts when the page is visible
    /// and online. Stops once the page has been reloaded.
    pub fn spawn_periodic_updates(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let interval_ms = self.config.update_poll_interval_ms();
        tokio::spawn(async move {
            loop {
                this.effects.time.sleep_ms(interval_ms).await;
                if this.state.lock().has_applied_reload() {
                    break;
                }
                if !this.tracker.visibility().is_visible() || !this.tracker.is_online() {
                    tracing::trace!("Skipping periodic update check");
                    continue;
                }
                let tracked = this.transition_logged(Transition::CheckStarted);
                match this.registration.update().await {
                    Ok(()) => tracing::debug!("Periodic worker update check requested"),
                    Err(HandoverError::NotRegistered) => {}
                    Err(e) => tracing::warn!(error = %e, "Periodic worker update check failed"),
                }
                if tracked {
                    this.transition_logged(Transition::CheckFinished);
                }
            }
        })
    }

    // -------------------------------------------------------------------------
    // Refresh and activation
    // -------------------------------------------------------------------------

    /// Handle a "new version waiting" signal.
    ///
    /// Unless forced, the decision policy runs first and the signal is dropped
    /// when the waiting worker carries the running build. Returns whether the
    /// refresh was flagged.
    pub async fn on_need_refresh(self: &Arc<Self>, force: bool) -> bool {
        if !force {
            let tracked = self.transition_logged(Transition::DecisionStarted);
            let decision = self.policy.decide().await;
            if tracked {
                self.transition_logged(Transition::DecisionFinished);
            }
            if !decision.should_apply() {
                tracing::info!(?decision, "Ignoring refresh signal without a real version change");
                return false;
            }
        }

        let user_active = self.tracker.update_user_active_state();
        if !self.transition_logged(Transition::RefreshNeeded { user_active }) {
            return false;
        }
        tracing::info!(force, user_active, "Update available");
        self.schedule_auto_apply_update();
        true
    }

    /// Flag a refresh without consulting the policy first
    pub async fn force_refresh(self: &Arc<Self>) -> bool {
        self.on_need_refresh(true).await
    }

    /// Apply the update once the app has booted.
    ///
    /// Returns `false` when a loop is already scheduled or an activation is in
    /// progress.
    pub fn schedule_auto_apply_update(self: &Arc<Self>) -> bool {
        if let Err(reason) = self.transition(Transition::AutoApplyScheduled) {
            tracing::debug!(%reason, "Auto-apply not scheduled");
            return false;
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let polls = this
                .boot
                .wait_ready(this.effects.time.as_ref(), this.config.auto_apply_poll_ms)
                .await;
            tracing::debug!(polls, "App booted; applying update");
            this.transition_logged(Transition::AutoApplyReleased);
            this.apply_update().await;
        });
        true
    }

    /// Activate the waiting worker.
    ///
    /// Never fails: every error is logged and reported in the outcome, and the
    /// activation mutex is released so a later trigger can retry.
    pub async fn apply_update(&self) -> ApplyOutcome {
        if self.config.suppress_activation {
            tracing::info!("Activation suppressed by configuration");
            return ApplyOutcome::Suppressed;
        }
        if let Err(reason) = self.transition(Transition::ActivationStarted) {
            tracing::debug!(%reason, "Activation already in progress");
            return ApplyOutcome::AlreadyUpdating;
        }

        let decision = self.policy.decide().await;
        match decision {
            Decision::Unchanged { .. } => {
                tracing::info!("Waiting worker carries the running build; aborting activation");
                self.transition_logged(Transition::ActivationAborted);
                return ApplyOutcome::Unchanged;
            }
            Decision::Deferred { .. } => {
                self.transition_logged(Transition::ActivationFailed);
                return ApplyOutcome::Deferred;
            }
            Decision::Changed { .. } | Decision::Unverified { .. } => {}
        }

        match self.activate_waiting().await {
            Ok(()) => {
                tracing::info!("Waiting worker told to take control");
                self.transition_logged(Transition::ActivationCommitted);
                self.policy.record_activation(&decision).await;
                ApplyOutcome::Activated
            }
            Err(e) => {
                tracing::error!(error = %e, "Activation failed");
                self.transition_logged(Transition::ActivationFailed);
                ApplyOutcome::Failed(e)
            }
        }
    }

    async fn activate_waiting(&self) -> HandoverResult<()> {
        let registration = self
            .registration
            .current()
            .ok_or(HandoverError::NotRegistered)?;
        let waiting = registration
            .waiting()
            .ok_or_else(|| HandoverError::platform("no waiting worker to activate"))?;
        waiting.post_message(WorkerMessage::SkipWaiting, None)?;
        registration.activate_waiting().await
    }

    // -------------------------------------------------------------------------
    // Reload and visibility
    // -------------------------------------------------------------------------

    /// Handle a controller change.
    ///
    /// Schedules exactly one reload for an activation this coordinator started;
    /// an unsolicited change is ignored. Returns whether a reload was scheduled.
    pub fn on_controller_change(self: &Arc<Self>) -> bool {
        match self.transition(Transition::ReloadScheduled) {
            Ok(()) => {}
            Err(TransitionRejected::NotUpdating) => {
                tracing::info!("Controller changed without an activation in progress; ignoring");
                return false;
            }
            Err(reason) => {
                tracing::debug!(%reason, "Reload already scheduled");
                return false;
            }
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let polls = this
                .boot
                .wait_ready(this.effects.time.as_ref(), this.config.reload_poll_ms)
                .await;
            if this.transition_logged(Transition::ReloadApplied) {
                tracing::info!(polls, "Reloading onto the new version");
                this.effects.page.reload();
            }
        });
        true
    }

    /// Re-derive activity after a visibility change.
    ///
    /// Returning to the app applies a pending update right away; otherwise a
    /// visible, online page runs a probe-gated check.
    pub async fn on_visibility_change(&self) {
        let active = self.tracker.update_user_active_state();
        self.transition_logged(Transition::UserActivity { active });
        if !active {
            tracing::trace!("Page hidden");
            return;
        }

        let apply_now = {
            let mut state = self.state.lock();
            state.should_apply_on_return()
                && self.apply_locked(&mut state, Transition::PendingAutoUpdateCleared)
        };
        if apply_now {
            tracing::info!("User returned with an update pending; applying");
            self.apply_update().await;
            return;
        }

        if self.tracker.is_online() {
            self.check_for_updates_with_probe().await;
        } else {
            tracing::debug!("Visible but offline; skipping update check");
        }
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorSnapshot> {
        self.snapshots.subscribe()
    }

    /// Current state snapshot
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.state.lock().snapshot()
    }

    /// Copy of the full state
    pub fn state(&self) -> CoordinatorState {
        self.state.lock().clone()
    }

    /// Apply a transition and publish the resulting snapshot
    pub(crate) fn transition(&self, transition: Transition) -> Result<(), TransitionRejected> {
        let mut state = self.state.lock();
        state.apply(transition)?;
        self.publish(&state);
        Ok(())
    }

    fn transition_logged(&self, transition: Transition) -> bool {
        match self.transition(transition) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(?transition, %reason, "Transition rejected");
                false
            }
        }
    }

    fn apply_locked(&self, state: &mut CoordinatorState, transition: Transition) -> bool {
        match state.apply(transition) {
            Ok(()) => {
                self.publish(state);
                true
            }
            Err(reason) => {
                tracing::debug!(?transition, %reason, "Transition rejected");
                false
            }
        }
    }

    fn publish(&self, state: &CoordinatorState) {
        let snapshot = state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Active configuration
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Boot-readiness signal shared with the app shell
    pub fn boot(&self) -> &BootSignal {
        &self.boot
    }

    /// Registration handle
    pub fn registration(&self) -> &RegistrationSlot {
        &self.registration
    }

    /// Activity tracker
    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    /// Decision policy
    pub fn policy(&self) -> &UpdateDecisionPolicy {
        &self.policy
    }

    /// Version probe
    pub fn probe(&self) -> &VersionProbe {
        &self.probe
    }
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .field("registration", &self.registration)
            .finish_non_exhaustive()
    }
}
