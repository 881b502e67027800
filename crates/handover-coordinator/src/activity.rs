//! Activity and visibility tracking
//!
//! `is_user_active` is a pure function of the platform's visibility reading,
//! optionally shadowed by an override. The platform reading starts from the
//! page and follows every visibility event afterwards. The override exists for
//! automated tests that need to simulate a tab switch without a real browser.

use handover_core::effects::PageEffects;
use handover_core::{PlatformInfo, Visibility};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Coarse device class used to gate secondary triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    /// iPhone, iPad, iPod, or an iPad reporting a desktop platform
    IosLike,
    /// Everything else
    Other,
}

impl DeviceClass {
    /// Classify a device from its user agent, platform and touch support
    pub fn classify(info: &PlatformInfo) -> Self {
        let ua = &info.user_agent;
        let ios_agent = ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|needle| ua.contains(needle));
        // iPadOS 13+ reports itself as a Mac.
        let desktop_ipad = info.platform == "MacIntel" && info.max_touch_points > 1;
        if ios_agent || desktop_ipad {
            DeviceClass::IosLike
        } else {
            DeviceClass::Other
        }
    }

    /// Whether focus and page-show events should trigger update checks.
    ///
    /// iOS-class browsers freeze background tabs without firing visibility
    /// changes reliably, so those devices also check on focus and on restore
    /// from the back/forward cache.
    pub fn wires_secondary_triggers(self) -> bool {
        matches!(self, DeviceClass::IosLike)
    }
}

/// Derives user activity from page visibility
pub struct ActivityTracker {
    page: Arc<dyn PageEffects>,
    native: RwLock<Visibility>,
    visibility_override: RwLock<Option<Visibility>>,
    device_class: DeviceClass,
}

impl ActivityTracker {
    /// Create a tracker, classifying the device once
    pub fn new(page: Arc<dyn PageEffects>) -> Self {
        let device_class = DeviceClass::classify(&page.platform_info());
        tracing::debug!(?device_class, "Classified device");
        Self {
            native: RwLock::new(page.visibility()),
            page,
            visibility_override: RwLock::new(None),
            device_class,
        }
    }

    /// Device class computed at construction
    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Record the platform's reading from a visibility event
    pub fn observe_visibility(&self, visibility: Visibility) {
        *self.native.write() = visibility;
    }

    /// Effective visibility: the override if set, else the platform reading
    pub fn visibility(&self) -> Visibility {
        let native = *self.native.read();
        self.visibility_override.read().unwrap_or(native)
    }

    /// Shadow the platform's visibility reading. `None` restores it.
    pub fn set_visibility_override(&self, visibility: Option<Visibility>) {
        *self.visibility_override.write() = visibility;
    }

    /// Current activity reading.
    ///
    /// This is the single place activity is derived; the coordinator stores the
    /// result through a state transition.
    pub fn update_user_active_state(&self) -> bool {
        self.visibility().is_visible()
    }

    /// Whether the platform reports connectivity
    pub fn is_online(&self) -> bool {
        self.page.is_online()
    }
}

impl std::fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("native", &*self.native.read())
            .field("visibility_override", &*self.visibility_override.read())
            .field("device_class", &self.device_class)
            .finish_non_exhaustive()
    }
}
