//! Update decision policy
//!
//! Decides whether activating the waiting worker is a real version change or a
//! no-op. Redundant registrations that report the same build would otherwise
//! trigger an activation and a reload on every page load.
//!
//! The running build is identified by the compiled-in hash, falling back to the
//! last confirmed hash in durable storage. The waiting build is identified via
//! the handshake. Only two known, equal hashes block activation. When either
//! side is unknown the policy is permissive.
//!
//! The one exception is a known waiting build that has already been activated
//! unverified as many times as the configured ceiling allows. Activating that
//! same build again can only end in another reload, so the policy defers it.
//! The count is kept per waiting build in durable storage: a different waiting
//! build starts from zero, and an unanswered handshake is never counted.

use crate::handshake::HandshakeChannel;
use handover_core::effects::StorageEffects;
use handover_core::BuildIdentity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Durable key for the last confirmed build hash
pub const BUILD_HASH_KEY: &str = "handover.build_hash";

/// Durable key for the unverified activation counter of [`UNVERIFIED_BUILD_KEY`]
pub const UNVERIFIED_ACTIVATIONS_KEY: &str = "handover.unverified_activations";

/// Durable key for the waiting build last activated without verification
pub const UNVERIFIED_BUILD_KEY: &str = "handover.unverified_build";

/// Outcome of comparing the running and waiting builds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Both hashes are known and differ
    Changed {
        /// Running build hash
        running: String,
        /// Waiting build hash
        waiting: String,
    },
    /// Both hashes are known and equal; activation would be a no-op
    Unchanged {
        /// The shared build hash
        hash: String,
    },
    /// At least one hash is unknown; activation is allowed
    Unverified {
        /// Running build hash, if known
        running: Option<String>,
        /// Waiting build hash, if known
        waiting: Option<String>,
    },
    /// The same waiting build was already activated unverified too often
    Deferred {
        /// Unverified activations recorded so far
        attempts: u32,
    },
}

impl Decision {
    /// Compare two optional hashes without consulting the activation ceiling
    pub fn evaluate(running: Option<&str>, waiting: Option<&str>) -> Self {
        match (running, waiting) {
            (Some(running), Some(waiting)) if running == waiting => Decision::Unchanged {
                hash: running.to_string(),
            },
            (Some(running), Some(waiting)) => Decision::Changed {
                running: running.to_string(),
                waiting: waiting.to_string(),
            },
            (running, waiting) => Decision::Unverified {
                running: running.map(str::to_string),
                waiting: waiting.map(str::to_string),
            },
        }
    }

    /// Whether the waiting worker should be activated
    pub fn should_apply(&self) -> bool {
        matches!(self, Decision::Changed { .. } | Decision::Unverified { .. })
    }

    /// Whether both hashes were known
    pub fn is_verified(&self) -> bool {
        matches!(self, Decision::Changed { .. } | Decision::Unchanged { .. })
    }
}

/// Version comparison between the running page and the waiting worker
#[derive(Clone)]
pub struct UpdateDecisionPolicy {
    handshake: HandshakeChannel,
    storage: Arc<dyn StorageEffects>,
    identity: BuildIdentity,
    max_unverified_activations: u32,
}

impl UpdateDecisionPolicy {
    /// Create a policy. A `max_unverified_activations` of zero disables the ceiling.
    pub fn new(
        handshake: HandshakeChannel,
        storage: Arc<dyn StorageEffects>,
        identity: BuildIdentity,
        max_unverified_activations: u32,
    ) -> Self {
        Self {
            handshake,
            storage,
            identity,
            max_unverified_activations,
        }
    }

    /// Identity of the running build
    pub fn identity(&self) -> &BuildIdentity {
        &self.identity
    }

    /// Whether activating the waiting worker is worthwhile
    pub async fn should_apply_update(&self) -> bool {
        self.decide().await.should_apply()
    }

    /// Compare the running and waiting builds
    pub async fn decide(&self) -> Decision {
        let waiting = self.handshake.get_waiting_build_hash().await;
        let running = self.running_build_hash().await;
        let decision = Decision::evaluate(running.as_deref(), waiting.as_deref());

        match &decision {
            Decision::Changed { running, waiting } => {
                tracing::info!(running = %running, waiting = %waiting, "New build is waiting");
                self.reset_unverified().await;
            }
            Decision::Unchanged { hash } => {
                tracing::info!(hash = %hash, "Waiting worker carries the running build");
                self.reset_unverified().await;
            }
            Decision::Unverified { running, waiting } => {
                let attempts = match waiting {
                    Some(waiting) => self.unverified_attempts_for(waiting).await,
                    None => 0,
                };
                if self.max_unverified_activations > 0 && attempts >= self.max_unverified_activations
                {
                    tracing::error!(
                        waiting = ?waiting,
                        attempts,
                        max = self.max_unverified_activations,
                        "Waiting build keeps coming back after activation; deferring update"
                    );
                    return Decision::Deferred { attempts };
                }
                tracing::warn!(
                    running = ?running,
                    waiting = ?waiting,
                    attempts,
                    "Build identity unknown; allowing activation"
                );
            }
            Decision::Deferred { .. } => {}
        }
        decision
    }

    /// Record that an activation was committed on the strength of `decision`.
    ///
    /// Only unverified activations of a known waiting build are counted.
    pub async fn record_activation(&self, decision: &Decision) {
        let Decision::Unverified {
            waiting: Some(waiting),
            ..
        } = decision
        else {
            return;
        };
        let attempts = self.unverified_attempts_for(waiting).await.saturating_add(1);
        let stored = async {
            self.storage
                .store(UNVERIFIED_BUILD_KEY, waiting.clone())
                .await?;
            self.storage
                .store(UNVERIFIED_ACTIVATIONS_KEY, attempts.to_string())
                .await
        };
        if let Err(e) = stored.await {
            tracing::warn!(error = %e, "Failed to persist unverified activation count");
        }
    }

    /// Persist the compiled-in hash once the running build is confirmed.
    ///
    /// Returns `true` if the stored copy changed.
    pub async fn confirm_running_build(&self) -> bool {
        let Some(compiled) = self.identity.build_hash() else {
            return false;
        };
        if self.stored_build_hash().await.as_deref() == Some(compiled) {
            return false;
        }
        match self
            .storage
            .store(BUILD_HASH_KEY, compiled.to_string())
            .await
        {
            Ok(()) => {
                tracing::debug!(hash = %compiled, "Confirmed running build hash");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist running build hash");
                false
            }
        }
    }

    /// Compiled-in hash, falling back to the last confirmed one
    pub async fn running_build_hash(&self) -> Option<String> {
        match self.identity.build_hash() {
            Some(hash) => Some(hash.to_string()),
            None => self.stored_build_hash().await,
        }
    }

    /// Unverified activations recorded for the build in [`UNVERIFIED_BUILD_KEY`]
    pub async fn unverified_activations(&self) -> u32 {
        match self.storage.retrieve(UNVERIFIED_ACTIVATIONS_KEY).await {
            Ok(Some(value)) => value.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read unverified activation count");
                0
            }
        }
    }

    async fn stored_build_hash(&self) -> Option<String> {
        match self.storage.retrieve(BUILD_HASH_KEY).await {
            Ok(value) => value
                .map(|hash| hash.trim().to_string())
                .filter(|hash| !hash.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read confirmed build hash");
                None
            }
        }
    }

    /// Waiting build last activated without verification
    pub async fn unverified_build(&self) -> Option<String> {
        match self.storage.retrieve(UNVERIFIED_BUILD_KEY).await {
            Ok(value) => value
                .map(|hash| hash.trim().to_string())
                .filter(|hash| !hash.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read unverified build");
                None
            }
        }
    }

    async fn unverified_attempts_for(&self, waiting: &str) -> u32 {
        if self.unverified_build().await.as_deref() == Some(waiting) {
            self.unverified_activations().await
        } else {
            0
        }
    }

    async fn reset_unverified(&self) {
        for key in [UNVERIFIED_BUILD_KEY, UNVERIFIED_ACTIVATIONS_KEY] {
            if let Err(e) = self.storage.remove(key).await {
                tracing::warn!(key, error = %e, "Failed to reset unverified activation count");
            }
        }
    }
}

impl std::fmt::Debug for UpdateDecisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDecisionPolicy")
            .field("identity", &self.identity)
            .field("max_unverified_activations", &self.max_unverified_activations)
            .finish_non_exhaustive()
    }
}
