//! Coordinator harness
//!
//! Builds an [`UpdateCoordinator`] over the mock platform with real tokio time,
//! so tests drive timers with `#[tokio::test(start_paused = true)]`.

use crate::http::MockHttp;
use crate::platform::{MockPage, MockRegistrar, MockRegistration, MockWaitingWorker, ReplyBehavior};
use handover_coordinator::{
    BootSignal, CoordinatorConfig, CoordinatorEffects, PlatformEvent, UpdateCoordinator,
};
use handover_core::effects::StorageEffects;
use handover_core::{BuildIdentity, PlatformInfo, Visibility};
use handover_effects::{MemoryStorageHandler, RealTimeHandler};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`CoordinatorHarness`]
#[derive(Clone)]
pub struct HarnessBuilder {
    config: CoordinatorConfig,
    build_hash: String,
    published: Option<String>,
    waiting: Option<ReplyBehavior>,
    platform: Option<PlatformInfo>,
    visibility: Visibility,
    online: bool,
    booted: bool,
    storage: MemoryStorageHandler,
    durable: Option<Arc<dyn StorageEffects>>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            config: CoordinatorConfig::for_app("/", "1.0.0"),
            build_hash: "build-1".to_string(),
            published: None,
            waiting: None,
            platform: None,
            visibility: Visibility::Visible,
            online: true,
            booted: true,
            storage: MemoryStorageHandler::new(),
            durable: None,
        }
    }
}

impl HarnessBuilder {
    /// Compiled-in app version of the running page
    pub fn app_version(mut self, version: &str) -> Self {
        self.config.app_version = version.to_string();
        self
    }

    /// Compiled-in build hash of the running page (may be empty)
    pub fn build_hash(mut self, hash: &str) -> Self {
        self.build_hash = hash.to_string();
        self
    }

    /// Version the server publishes; unset means the server is unreachable
    pub fn publishing(mut self, version: &str) -> Self {
        self.published = Some(version.to_string());
        self
    }

    /// Install a waiting worker answering with `behavior`
    pub fn waiting(mut self, behavior: ReplyBehavior) -> Self {
        self.waiting = Some(behavior);
        self
    }

    /// Platform details for device classification
    pub fn platform(mut self, info: PlatformInfo) -> Self {
        self.platform = Some(info);
        self
    }

    /// Start with the page hidden
    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    /// Start offline
    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    /// Whether the app shell has already booted
    pub fn booted(mut self, booted: bool) -> Self {
        self.booted = booted;
        self
    }

    /// Share durable storage, e.g. to simulate a reload
    pub fn storage(mut self, storage: MemoryStorageHandler) -> Self {
        self.storage = storage;
        self
    }

    /// Run against another storage handler instead of the shared memory store
    pub fn durable_storage(mut self, storage: Arc<dyn StorageEffects>) -> Self {
        self.durable = Some(storage);
        self
    }

    /// Adjust the configuration
    pub fn configure(mut self, f: impl FnOnce(&mut CoordinatorConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Build the harness
    pub fn build(self) -> CoordinatorHarness {
        let page = Arc::new(MockPage::new());
        page.set_visibility(self.visibility);
        page.set_online(self.online);
        if let Some(info) = self.platform {
            page.set_platform_info(info);
        }

        let registration = Arc::new(MockRegistration::new("/"));
        if let Some(behavior) = self.waiting {
            registration.set_waiting(Some(Arc::new(MockWaitingWorker::new(behavior))));
        }
        let registrar = Arc::new(MockRegistrar::new(registration.clone()));

        let http = Arc::new(match &self.published {
            Some(version) => MockHttp::publishing(version),
            None => MockHttp::unreachable(),
        });

        let boot = BootSignal::new();
        if self.booted {
            boot.mark_ready();
        }

        let storage = self
            .durable
            .unwrap_or_else(|| Arc::new(self.storage.clone()) as Arc<dyn StorageEffects>);
        let effects =
            CoordinatorEffects::new(page.clone(), registrar.clone(), http.clone(), storage)
                .with_time(Arc::new(RealTimeHandler::new()));
        let identity = BuildIdentity::new(self.config.app_version.clone(), self.build_hash);
        let coordinator =
            UpdateCoordinator::with_identity(self.config, identity, effects, boot.clone())
                .expect("harness configuration is valid");

        CoordinatorHarness {
            coordinator,
            page,
            registration,
            registrar,
            http,
            storage: self.storage,
            boot,
        }
    }
}

/// A coordinator wired to the mock platform
#[derive(Debug)]
pub struct CoordinatorHarness {
    /// Coordinator under test
    pub coordinator: Arc<UpdateCoordinator>,
    /// Mock page
    pub page: Arc<MockPage>,
    /// Registration handed out by the registrar
    pub registration: Arc<MockRegistration>,
    /// Mock registrar
    pub registrar: Arc<MockRegistrar>,
    /// Mock version endpoint
    pub http: Arc<MockHttp>,
    /// Shared memory store, unless the builder was given `durable_storage`
    pub storage: MemoryStorageHandler,
    /// Boot signal shared with the coordinator
    pub boot: BootSignal,
}

impl CoordinatorHarness {
    /// Start building a harness
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Initialize the coordinator, which registers the worker
    pub async fn initialize(&self) {
        self.coordinator
            .initialize()
            .await
            .expect("mock registration succeeds");
    }

    /// The waiting worker, if installed
    pub fn worker(&self) -> Option<Arc<MockWaitingWorker>> {
        self.registration.waiting_worker()
    }

    /// Install a new waiting worker
    pub fn install_waiting(&self, behavior: ReplyBehavior) -> Arc<MockWaitingWorker> {
        let worker = Arc::new(MockWaitingWorker::new(behavior));
        self.registration.set_waiting(Some(worker.clone()));
        worker
    }

    /// Change visibility on the page and deliver the event
    pub async fn set_visibility(&self, visibility: Visibility) {
        self.page.set_visibility(visibility);
        self.coordinator
            .handle_event(PlatformEvent::VisibilityChanged(visibility))
            .await;
    }

    /// Change connectivity on the page and deliver the event
    pub async fn set_online(&self, online: bool) {
        self.page.set_online(online);
        self.coordinator
            .handle_event(PlatformEvent::ConnectivityChanged(online))
            .await;
    }

    /// Let virtual time pass so spawned tasks make progress
    pub async fn advance(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
