//! Layer 5: Update Coordinator
//!
//! Detects a newly deployed application version, decides whether and when to
//! activate it, and moves the running page onto it with exactly one reload.
//!
//! # Components
//!
//! - [`VersionProbe`]: cache-busted fetch of the published version descriptor
//! - [`RegistrationSlot`]: the page's single update-worker registration
//! - [`HandshakeChannel`]: bounded "what build are you?" exchange with a waiting worker
//! - [`UpdateDecisionPolicy`]: real version change or no-op?
//! - [`ActivityTracker`]: visibility-derived activity and device classification
//! - [`UpdateCoordinator`]: the state machine tying them together
//! - [`BootSignal`]: one-shot "app has booted" notification from the shell
//!
//! Platform access goes through the effect traits in `handover-core`. The
//! embedding shell implements the page and worker traits and feeds browser
//! callbacks in as [`PlatformEvent`]s.

#![forbid(unsafe_code)]

pub mod activity;
pub mod boot;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod handshake;
#[cfg(feature = "test-hooks")]
pub mod hooks;
pub mod policy;
pub mod probe;
pub mod registration;
pub mod state;

pub use activity::{ActivityTracker, DeviceClass};
pub use boot::BootSignal;
pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{ApplyOutcome, CheckOutcome, CoordinatorEffects, UpdateCoordinator};
pub use events::PlatformEvent;
pub use handshake::HandshakeChannel;
#[cfg(feature = "test-hooks")]
pub use hooks::DebugHooks;
pub use policy::{
    Decision, UpdateDecisionPolicy, BUILD_HASH_KEY, UNVERIFIED_ACTIVATIONS_KEY, UNVERIFIED_BUILD_KEY,
};
pub use probe::VersionProbe;
pub use registration::RegistrationSlot;
pub use state::{CoordinatorSnapshot, CoordinatorState, Transition, TransitionRejected, UpdatePhase};
