//! Handover Core - Update Coordination Foundation
//!
//! This crate provides the domain types and effect interfaces shared by every
//! Handover crate. It contains no scheduling logic and no platform bindings.
//!
//! # Architecture Layers
//!
//! ## Domain Types
//! - `VersionDescriptor`: the version the deploy server currently publishes
//! - `BuildIdentity`: compiled-in app version and build hash of the running page
//! - `Visibility`, `PlatformInfo`: page-level observations
//!
//! ## Worker Message Protocol
//! - `WorkerMessage`: `SKIP_WAITING` and `GET_VERSION` requests
//! - `MessageChannel`: two-port reply channel used by the version handshake
//!
//! ## Effect Interfaces (Pure Signatures)
//! - `PhysicalTimeEffects`: wall clock and sleeps
//! - `HttpEffects`: single GET requests for the version probe
//! - `StorageEffects`: durable key/value storage for the confirmed build hash
//! - `PageEffects`: visibility, connectivity, platform info, reload
//! - `WorkerRegistrar` / `WorkerRegistration` / `WaitingWorker`: update-worker lifecycle
//!
//! Production handlers live in `handover-effects`; scripted mocks live in
//! `handover-testkit`.

#![forbid(unsafe_code)]

/// Pure effect interfaces (no implementations)
pub mod effects;

/// Unified error handling
pub mod errors;

/// Worker message protocol and reply channels
pub mod messages;

/// Version, build identity and page observation types
pub mod types;

pub use effects::{
    HttpEffects, HttpRequest, HttpResponse, PageEffects, PhysicalTimeEffects, StorageEffects,
    WaitingWorker, WorkerRegistrar, WorkerRegistration,
};
pub use errors::{HandoverError, Result as HandoverResult};
pub use messages::{MessageChannel, ReceivePort, ReplyPort, VersionReply, WorkerMessage};
pub use types::{BuildIdentity, PlatformInfo, VersionDescriptor, Visibility};
