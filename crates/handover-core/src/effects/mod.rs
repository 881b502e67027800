//! Pure effect interfaces
//!
//! Every interaction between the coordinator and the outside world goes
//! through one of these traits. Production handlers live in
//! `handover-effects`; the embedding shell implements the page and worker
//! traits against the real platform; `handover-testkit` provides scripted
//! doubles.
//!
//! # Effect Classification
//!
//! - **Infrastructure**: `PhysicalTimeEffects`, `HttpEffects`, `StorageEffects`
//! - **Platform**: `PageEffects`, `WorkerRegistrar`, `WorkerRegistration`, `WaitingWorker`

pub mod network;
pub mod page;
pub mod storage;
pub mod time;
pub mod worker;

pub use network::{HttpEffects, HttpRequest, HttpResponse};
pub use page::PageEffects;
pub use storage::StorageEffects;
pub use time::PhysicalTimeEffects;
pub use worker::{WaitingWorker, WorkerRegistrar, WorkerRegistration};
