//! Scripted page and update-worker platform
//!
//! Every mock records what the coordinator asked of it, so tests can assert on
//! call counts (reloads, `update()` calls, `SKIP_WAITING` posts) instead of on
//! log output.

use async_trait::async_trait;
use handover_coordinator::PlatformEvent;
use handover_core::effects::{PageEffects, WaitingWorker, WorkerRegistrar, WorkerRegistration};
use handover_core::{
    HandoverError, HandoverResult, PlatformInfo, ReplyPort, Visibility, WorkerMessage,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// Page
// =============================================================================

/// Foreground page with settable observations and a reload counter
#[derive(Debug)]
pub struct MockPage {
    visibility: Mutex<Visibility>,
    online: AtomicBool,
    platform: Mutex<PlatformInfo>,
    reloads: AtomicU32,
}

impl MockPage {
    /// Visible, online desktop page
    pub fn new() -> Self {
        Self {
            visibility: Mutex::new(Visibility::Visible),
            online: AtomicBool::new(true),
            platform: Mutex::new(PlatformInfo {
                user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
                platform: "Linux x86_64".to_string(),
                max_touch_points: 0,
            }),
            reloads: AtomicU32::new(0),
        }
    }

    /// Set the native visibility reading
    pub fn set_visibility(&self, visibility: Visibility) {
        *self.visibility.lock() = visibility;
    }

    /// Set connectivity
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Set the platform details used for device classification
    pub fn set_platform_info(&self, info: PlatformInfo) {
        *self.platform.lock() = info;
    }

    /// Number of reloads performed
    pub fn reload_count(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl Default for MockPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageEffects for MockPage {
    fn visibility(&self) -> Visibility {
        *self.visibility.lock()
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn platform_info(&self) -> PlatformInfo {
        self.platform.lock().clone()
    }

    fn reload(&self) {
        let count = self.reloads.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(count, "Mock page reloaded");
    }
}

// =============================================================================
// Waiting worker
// =============================================================================

/// How a mock waiting worker answers `GET_VERSION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBehavior {
    /// Answer immediately with this build hash
    Reply(String),
    /// Never answer, keeping the reply port open
    Silent,
    /// Answer with a payload that is not a version reply
    Malformed,
    /// Answer after a delay
    Delayed {
        /// Delay before answering
        ms: u64,
        /// Build hash to report
        hash: String,
    },
}

impl ReplyBehavior {
    /// Immediate reply with `hash`
    pub fn reply(hash: impl Into<String>) -> Self {
        ReplyBehavior::Reply(hash.into())
    }
}

/// Installed worker waiting to take control
#[derive(Debug)]
pub struct MockWaitingWorker {
    behavior: Mutex<ReplyBehavior>,
    held_ports: Mutex<Vec<ReplyPort>>,
    version_requests: AtomicU32,
    skip_waiting: AtomicU32,
    fail_skip_waiting: AtomicBool,
}

impl MockWaitingWorker {
    /// Worker answering with `behavior`
    pub fn new(behavior: ReplyBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            held_ports: Mutex::new(Vec::new()),
            version_requests: AtomicU32::new(0),
            skip_waiting: AtomicU32::new(0),
            fail_skip_waiting: AtomicBool::new(false),
        }
    }

    /// Change how `GET_VERSION` is answered
    pub fn set_behavior(&self, behavior: ReplyBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Make `SKIP_WAITING` posts fail
    pub fn fail_skip_waiting(&self, fail: bool) {
        self.fail_skip_waiting.store(fail, Ordering::SeqCst);
    }

    /// Number of `GET_VERSION` requests received
    pub fn version_requests(&self) -> u32 {
        self.version_requests.load(Ordering::SeqCst)
    }

    /// Number of `SKIP_WAITING` messages received
    pub fn skip_waiting_count(&self) -> u32 {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn answer(&self, port: ReplyPort) -> HandoverResult<()> {
        let behavior = self.behavior.lock().clone();
        match behavior {
            ReplyBehavior::Reply(hash) => port.post(json!({ "buildHash": hash })),
            ReplyBehavior::Silent => {
                self.held_ports.lock().push(port);
                Ok(())
            }
            ReplyBehavior::Malformed => port.post(json!({ "version": 42 })),
            ReplyBehavior::Delayed { ms, hash } => {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    // The page may have timed out and dropped its end.
                    let _ = port.post(json!({ "buildHash": hash }));
                });
                Ok(())
            }
        }
    }
}

impl WaitingWorker for MockWaitingWorker {
    fn post_message(&self, message: WorkerMessage, reply_port: Option<ReplyPort>) -> HandoverResult<()> {
        match message {
            WorkerMessage::SkipWaiting => {
                if self.fail_skip_waiting.load(Ordering::SeqCst) {
                    return Err(HandoverError::platform("worker rejected SKIP_WAITING"));
                }
                self.skip_waiting.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            WorkerMessage::GetVersion => {
                self.version_requests.fetch_add(1, Ordering::SeqCst);
                match reply_port {
                    Some(port) => self.answer(port),
                    None => Err(HandoverError::invalid("GET_VERSION without a reply port")),
                }
            }
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Registration with an optional waiting worker and call counters
#[derive(Debug)]
pub struct MockRegistration {
    scope: String,
    waiting: Mutex<Option<Arc<MockWaitingWorker>>>,
    updates: AtomicU32,
    activations: AtomicU32,
    fail_update: AtomicBool,
    fail_activation: AtomicBool,
    controller_events: Mutex<Option<mpsc::Sender<PlatformEvent>>>,
}

impl MockRegistration {
    /// Registration for `scope` without a waiting worker
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            waiting: Mutex::new(None),
            updates: AtomicU32::new(0),
            activations: AtomicU32::new(0),
            fail_update: AtomicBool::new(false),
            fail_activation: AtomicBool::new(false),
            controller_events: Mutex::new(None),
        }
    }

    /// Install (or clear) the waiting worker
    pub fn set_waiting(&self, worker: Option<Arc<MockWaitingWorker>>) {
        *self.waiting.lock() = worker;
    }

    /// The installed waiting worker
    pub fn waiting_worker(&self) -> Option<Arc<MockWaitingWorker>> {
        self.waiting.lock().clone()
    }

    /// Make `update()` fail
    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Make `activate_waiting()` fail
    pub fn fail_activation(&self, fail: bool) {
        self.fail_activation.store(fail, Ordering::SeqCst);
    }

    /// Emit `ControllerChanged` on `sender` whenever activation completes
    pub fn emit_controller_changes(&self, sender: mpsc::Sender<PlatformEvent>) {
        *self.controller_events.lock() = Some(sender);
    }

    /// Number of `update()` calls
    pub fn update_count(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    /// Number of `activate_waiting()` calls
    pub fn activation_count(&self) -> u32 {
        self.activations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerRegistration for MockRegistration {
    fn scope(&self) -> String {
        self.scope.clone()
    }

    fn waiting(&self) -> Option<Arc<dyn WaitingWorker>> {
        self.waiting_worker()
            .map(|worker| worker as Arc<dyn WaitingWorker>)
    }

    async fn update(&self) -> HandoverResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(HandoverError::network("worker script fetch failed"));
        }
        Ok(())
    }

    async fn activate_waiting(&self) -> HandoverResult<()> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        if self.fail_activation.load(Ordering::SeqCst) {
            return Err(HandoverError::platform("activation rejected"));
        }
        if let Some(sender) = self.controller_events.lock().as_ref() {
            let _ = sender.try_send(PlatformEvent::ControllerChanged);
        }
        Ok(())
    }
}

/// Registrar handing out one shared [`MockRegistration`]
#[derive(Debug)]
pub struct MockRegistrar {
    registration: Arc<MockRegistration>,
    registrations: AtomicU32,
    fail: AtomicBool,
}

impl MockRegistrar {
    /// Registrar returning `registration`
    pub fn new(registration: Arc<MockRegistration>) -> Self {
        Self {
            registration,
            registrations: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Make registration fail
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of registration attempts
    pub fn registration_count(&self) -> u32 {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerRegistrar for MockRegistrar {
    async fn register(&self, script_url: &str) -> HandoverResult<Arc<dyn WorkerRegistration>> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HandoverError::platform(format!(
                "failed to register {script_url}"
            )));
        }
        Ok(self.registration.clone() as Arc<dyn WorkerRegistration>)
    }
}
