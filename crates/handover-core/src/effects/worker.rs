//! Update-worker registration interfaces
//!
//! The platform owns exactly one registration per page. The coordinator reads
//! it from many triggers and writes to it only when activating.

use crate::errors::Result;
use crate::messages::{ReplyPort, WorkerMessage};
use async_trait::async_trait;
use std::sync::Arc;

/// An installed worker that is waiting to take control
pub trait WaitingWorker: Send + Sync {
    /// Post a message, optionally transferring a reply port
    fn post_message(&self, message: WorkerMessage, reply_port: Option<ReplyPort>) -> Result<()>;
}

/// The page's registration with the update-worker
#[async_trait]
pub trait WorkerRegistration: Send + Sync {
    /// Scope URL the registration controls
    fn scope(&self) -> String;

    /// The waiting worker, if a newer version has been installed
    fn waiting(&self) -> Option<Arc<dyn WaitingWorker>>;

    /// Ask the platform to re-fetch the worker script and install it if changed
    async fn update(&self) -> Result<()>;

    /// Finalize activation of the waiting worker once it was told to skip waiting
    async fn activate_waiting(&self) -> Result<()>;
}

/// Registers the update-worker script
#[async_trait]
pub trait WorkerRegistrar: Send + Sync {
    /// Register `script_url` and return the registration handle
    async fn register(&self, script_url: &str) -> Result<Arc<dyn WorkerRegistration>>;
}
