//! Platform events delivered to the coordinator
//!
//! The embedding shell translates browser callbacks into these and sends them
//! on the coordinator's event channel.

use handover_core::effects::WorkerRegistration;
use handover_core::Visibility;
use std::sync::Arc;

/// Signal from the page, the network, or the update-worker
#[derive(Clone)]
pub enum PlatformEvent {
    /// Page visibility changed
    VisibilityChanged(Visibility),
    /// Connectivity changed (`true` = online)
    ConnectivityChanged(bool),
    /// The page was shown, possibly restored from the back/forward cache
    PageShow {
        /// Restored from the back/forward cache
        persisted: bool,
    },
    /// The window gained focus
    FocusGained,
    /// The worker reports that a new version is installed and waiting.
    ///
    /// Gated by the decision policy; call `UpdateCoordinator::force_refresh`
    /// to flag a refresh without the version comparison.
    NeedRefresh,
    /// The worker has cached everything needed offline
    OfflineReady,
    /// A registration completed (or was replaced)
    Registered(Arc<dyn WorkerRegistration>),
    /// Registration failed
    RegisterError(String),
    /// A new worker took control of the page
    ControllerChanged,
}

impl PlatformEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            PlatformEvent::VisibilityChanged(_) => "visibility_changed",
            PlatformEvent::ConnectivityChanged(_) => "connectivity_changed",
            PlatformEvent::PageShow { .. } => "page_show",
            PlatformEvent::FocusGained => "focus_gained",
            PlatformEvent::NeedRefresh => "need_refresh",
            PlatformEvent::OfflineReady => "offline_ready",
            PlatformEvent::Registered(_) => "registered",
            PlatformEvent::RegisterError(_) => "register_error",
            PlatformEvent::ControllerChanged => "controller_changed",
        }
    }
}

impl std::fmt::Debug for PlatformEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformEvent::VisibilityChanged(v) => f.debug_tuple("VisibilityChanged").field(v).finish(),
            PlatformEvent::ConnectivityChanged(online) => {
                f.debug_tuple("ConnectivityChanged").field(online).finish()
            }
            PlatformEvent::PageShow { persisted } => f
                .debug_struct("PageShow")
                .field("persisted", persisted)
                .finish(),
            PlatformEvent::Registered(registration) => f
                .debug_tuple("Registered")
                .field(&registration.scope())
                .finish(),
            PlatformEvent::RegisterError(message) => {
                f.debug_tuple("RegisterError").field(message).finish()
            }
            other => f.write_str(other.name()),
        }
    }
}
