//! Foreground page interface
//!
//! Implemented by the embedding shell over `document.visibilityState`,
//! `navigator.onLine`, `navigator.userAgent` and `location.reload()`.

use crate::types::{PlatformInfo, Visibility};

/// Observations of, and the single command on, the foreground page
pub trait PageEffects: Send + Sync {
    /// Native visibility reading
    fn visibility(&self) -> Visibility;

    /// Whether the platform currently reports network connectivity
    fn is_online(&self) -> bool;

    /// Details used for device classification
    fn platform_info(&self) -> PlatformInfo;

    /// Perform a full page reload
    fn reload(&self);
}
