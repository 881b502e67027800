//! Worker registration handle
//!
//! Holds the page's single update-worker registration. The slot is empty until
//! the registrar reports back after the first idle slot, and is replaced
//! wholesale when a fresh registration event arrives.

use handover_core::effects::{WaitingWorker, WorkerRegistration};
use handover_core::{HandoverError, HandoverResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared slot for the current registration
#[derive(Default)]
pub struct RegistrationSlot {
    current: RwLock<Option<Arc<dyn WorkerRegistration>>>,
}

impl RegistrationSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a registration, replacing any previous one
    pub fn capture(&self, registration: Arc<dyn WorkerRegistration>) {
        let scope = registration.scope();
        let replaced = self.current.write().replace(registration).is_some();
        tracing::info!(scope = %scope, replaced, "Update worker registered");
    }

    /// Current registration, if any
    pub fn current(&self) -> Option<Arc<dyn WorkerRegistration>> {
        self.current.read().clone()
    }

    /// Whether a registration has been captured
    pub fn is_registered(&self) -> bool {
        self.current.read().is_some()
    }

    /// The waiting worker of the current registration
    pub fn waiting(&self) -> Option<Arc<dyn WaitingWorker>> {
        self.current().and_then(|registration| registration.waiting())
    }

    /// Ask the platform to re-check the worker script
    pub async fn update(&self) -> HandoverResult<()> {
        let registration = self.current().ok_or(HandoverError::NotRegistered)?;
        registration.update().await
    }
}

impl std::fmt::Debug for RegistrationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use handover_core::{ReplyPort, WorkerMessage};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Idle;

    impl WaitingWorker for Idle {
        fn post_message(&self, _: WorkerMessage, _: Option<ReplyPort>) -> HandoverResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct Registration {
        scope: &'static str,
        has_waiting: bool,
        updates: AtomicU32,
    }

    #[async_trait]
    impl WorkerRegistration for Registration {
        fn scope(&self) -> String {
            self.scope.to_string()
        }

        fn waiting(&self) -> Option<Arc<dyn WaitingWorker>> {
            self.has_waiting
                .then(|| Arc::new(Idle) as Arc<dyn WaitingWorker>)
        }

        async fn update(&self) -> HandoverResult<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn activate_waiting(&self) -> HandoverResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_update_without_registration() {
        let slot = RegistrationSlot::new();
        assert!(!slot.is_registered());
        assert!(slot.waiting().is_none());
        assert_matches!(slot.update().await, Err(HandoverError::NotRegistered));
    }

    #[tokio::test]
    async fn test_capture_and_replace() {
        let slot = RegistrationSlot::new();
        let first = Arc::new(Registration {
            scope: "/a/",
            ..Default::default()
        });
        slot.capture(first.clone());
        slot.update().await.unwrap();
        assert_eq!(first.updates.load(Ordering::SeqCst), 1);
        assert!(slot.waiting().is_none());

        let second = Arc::new(Registration {
            scope: "/a/",
            has_waiting: true,
            ..Default::default()
        });
        slot.capture(second.clone());
        slot.update().await.unwrap();
        assert_eq!(first.updates.load(Ordering::SeqCst), 1);
        assert_eq!(second.updates.load(Ordering::SeqCst), 1);
        assert!(slot.waiting().is_some());
    }
}
