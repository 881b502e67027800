//! Version handshake with a waiting worker
//!
//! Asks the waiting worker for its build hash over a dedicated reply channel
//! and races the answer against a timeout. Every call opens its own channel,
//! so concurrent handshakes never see each other's replies.

use crate::registration::RegistrationSlot;
use handover_core::effects::{PhysicalTimeEffects, WaitingWorker};
use handover_core::{HandoverError, HandoverResult, MessageChannel, VersionReply, WorkerMessage};
use std::sync::Arc;

/// Bounded request/reply exchange with the waiting worker
#[derive(Clone)]
pub struct HandshakeChannel {
    registration: Arc<RegistrationSlot>,
    time: Arc<dyn PhysicalTimeEffects>,
    timeout_ms: u64,
}

impl HandshakeChannel {
    /// Create a handshake bounded by `timeout_ms`
    pub fn new(
        registration: Arc<RegistrationSlot>,
        time: Arc<dyn PhysicalTimeEffects>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            registration,
            time,
            timeout_ms,
        }
    }

    /// Build hash reported by the waiting worker.
    ///
    /// `None` when there is no waiting worker, when it does not answer within
    /// the timeout, or when its answer is malformed.
    pub async fn get_waiting_build_hash(&self) -> Option<String> {
        let worker = self.registration.waiting()?;
        match self.request_build_hash(worker.as_ref()).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(error = %e, "Waiting worker did not report its version");
                None
            }
        }
    }

    async fn request_build_hash(&self, worker: &dyn WaitingWorker) -> HandoverResult<String> {
        let MessageChannel { port1, port2 } = MessageChannel::new();
        worker.post_message(WorkerMessage::GetVersion, Some(port2))?;

        tokio::select! {
            reply = port1.recv() => {
                let value = reply
                    .ok_or_else(|| HandoverError::platform("waiting worker dropped the reply port"))?;
                VersionReply::parse(value)
                    .map(|reply| reply.build_hash)
                    .ok_or_else(|| HandoverError::serialization("malformed version reply"))
            }
            _ = self.time.sleep_ms(self.timeout_ms) => Err(HandoverError::timeout(self.timeout_ms)),
        }
    }
}

impl std::fmt::Debug for HandshakeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeChannel")
            .field("timeout_ms", &self.timeout_ms)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use handover_core::effects::WorkerRegistration;
    use assert_matches::assert_matches;
    use handover_core::ReplyPort;
    use handover_effects::RealTimeHandler;
    use serde_json::{json, Value};
    use std::time::Duration;

    enum Answer {
        Reply(Value),
        Silent,
        After(u64, Value),
    }

    struct Worker(Answer, parking_lot::Mutex<Vec<ReplyPort>>);

    impl WaitingWorker for Worker {
        fn post_message(&self, message: WorkerMessage, port: Option<ReplyPort>) -> HandoverResult<()> {
            assert_eq!(message, WorkerMessage::GetVersion);
            let Some(port) = port else {
                return Ok(());
            };
            match &self.0 {
                Answer::Reply(value) => {
                    port.post(value.clone())?;
                }
                Answer::Silent => self.1.lock().push(port),
                Answer::After(ms, value) => {
                    let (ms, value) = (*ms, value.clone());
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        let _ = port.post(value);
                    });
                }
            }
            Ok(())
        }
    }

    struct Registration(Option<Arc<Worker>>);

    #[async_trait]
    impl WorkerRegistration for Registration {
        fn scope(&self) -> String {
            "/".to_string()
        }

        fn waiting(&self) -> Option<Arc<dyn WaitingWorker>> {
            self.0.clone().map(|w| w as Arc<dyn WaitingWorker>)
        }

        async fn update(&self) -> HandoverResult<()> {
            Ok(())
        }

        async fn activate_waiting(&self) -> HandoverResult<()> {
            Ok(())
        }
    }

    fn channel(answer: Option<Answer>) -> HandshakeChannel {
        let slot = Arc::new(RegistrationSlot::new());
        let worker = answer.map(|a| Arc::new(Worker(a, Default::default())));
        slot.capture(Arc::new(Registration(worker)));
        HandshakeChannel::new(slot, Arc::new(RealTimeHandler::new()), 1_500)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_waiting_worker() {
        assert_eq!(channel(None).get_waiting_build_hash().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_well_formed_reply() {
        let handshake = channel(Some(Answer::Reply(json!({"buildHash": "b2"}))));
        assert_eq!(handshake.get_waiting_build_hash().await.as_deref(), Some("b2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply() {
        let handshake = channel(Some(Answer::Reply(json!({"version": "b2"}))));
        assert_eq!(handshake.get_waiting_build_hash().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_worker_times_out_within_bound() {
        let handshake = channel(Some(Answer::Silent));
        let start = tokio::time::Instant::now();
        assert_eq!(handshake.get_waiting_build_hash().await, None);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1_500));
        assert!(elapsed < Duration::from_millis(1_600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_classified() {
        let silent = channel(Some(Answer::Silent));
        let worker = silent.registration.waiting().unwrap();
        assert_matches!(
            silent.request_build_hash(worker.as_ref()).await,
            Err(HandoverError::Timeout { timeout_ms: 1_500 })
        );

        let malformed = channel(Some(Answer::Reply(json!({"buildHash": 7}))));
        let worker = malformed.registration.waiting().unwrap();
        assert_matches!(
            malformed.request_build_hash(worker.as_ref()).await,
            Err(HandoverError::Serialization { .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_is_ignored() {
        let handshake = channel(Some(Answer::After(2_000, json!({"buildHash": "b2"}))));
        assert_eq!(handshake.get_waiting_build_hash().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_before_timeout_returns_early() {
        let handshake = channel(Some(Answer::After(200, json!({"buildHash": "b2"}))));
        let start = tokio::time::Instant::now();
        assert_eq!(handshake.get_waiting_build_hash().await.as_deref(), Some("b2"));
        assert!(start.elapsed() < Duration::from_millis(1_500));
    }
}
