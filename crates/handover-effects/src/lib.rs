//! Layer 3: Production Effect Handlers
//!
//! Stateless or self-contained implementations of the infrastructure effect
//! traits from `handover-core`:
//! - [`RealTimeHandler`]: system clock and tokio sleeps
//! - [`ReqwestHttpHandler`]: HTTP GET over reqwest
//! - [`FilesystemStorageHandler`]: one file per key with atomic replacement
//! - [`MemoryStorageHandler`]: process-local storage for embedding and tests
//!
//! Page and worker-registration effects are platform bindings and are
//! implemented by the embedding shell.

#![forbid(unsafe_code)]

pub mod http;
pub mod storage;
pub mod time;

pub use http::ReqwestHttpHandler;
pub use storage::{FilesystemStorageHandler, MemoryStorageHandler};
pub use time::RealTimeHandler;
