//! Version, build identity and page observation types

use serde::{Deserialize, Serialize};

/// Build hash embedded at compile time via the `HANDOVER_BUILD_HASH` environment
/// variable. Empty when the build configuration does not provide one.
pub const COMPILED_BUILD_HASH: &str = match option_env!("HANDOVER_BUILD_HASH") {
    Some(hash) => hash,
    None => "",
};

/// Remote descriptor of the version the deploy server currently publishes.
///
/// Fetched fresh by every probe and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Published application version
    pub version: String,
}

/// Identity of the build running in this page.
///
/// Both values are fixed for the lifetime of the process. The persisted copy
/// of the build hash lives in durable storage and is managed by the decision
/// policy, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildIdentity {
    app_version: String,
    build_hash: String,
}

impl BuildIdentity {
    /// Create an identity from explicit values
    pub fn new(app_version: impl Into<String>, build_hash: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
            build_hash: build_hash.into(),
        }
    }

    /// Create an identity using the compiled-in build hash
    pub fn compiled(app_version: impl Into<String>) -> Self {
        Self::new(app_version, COMPILED_BUILD_HASH)
    }

    /// Compiled-in application version
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Compiled-in build hash, `None` when the build did not embed one
    pub fn build_hash(&self) -> Option<&str> {
        let hash = self.build_hash.trim();
        (!hash.is_empty()).then_some(hash)
    }

    /// Whether a published version is the one this page is already running
    pub fn matches_published(&self, published: &str) -> bool {
        !self.app_version.is_empty() && self.app_version == published.trim()
    }
}

/// Page visibility as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// The page is the foregrounded, visible tab
    #[default]
    Visible,
    /// The page is backgrounded, minimized or behind another tab
    Hidden,
}

impl Visibility {
    /// Whether this reading counts as visible
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Platform details used for device classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlatformInfo {
    /// Navigator user agent string
    pub user_agent: String,
    /// Navigator platform string (e.g. `MacIntel`)
    pub platform: String,
    /// Maximum simultaneous touch points
    pub max_touch_points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_build_hash_is_unknown() {
        assert_eq!(BuildIdentity::new("1.0.0", "").build_hash(), None);
        assert_eq!(BuildIdentity::new("1.0.0", "  ").build_hash(), None);
        assert_eq!(
            BuildIdentity::new("1.0.0", "abc123").build_hash(),
            Some("abc123")
        );
    }

    #[test]
    fn test_matches_published() {
        let identity = BuildIdentity::new("1.2.0", "abc123");
        assert!(identity.matches_published("1.2.0"));
        assert!(identity.matches_published(" 1.2.0\n"));
        assert!(!identity.matches_published("1.2.1"));
        assert!(!BuildIdentity::new("", "abc").matches_published(""));
    }

    #[test]
    fn test_descriptor_parsing() {
        let descriptor: VersionDescriptor =
            serde_json::from_str(r#"{"version":"1.2.0","builtAt":"now"}"#).unwrap();
        assert_eq!(descriptor.version, "1.2.0");
        assert!(serde_json::from_str::<VersionDescriptor>(r#"{"v":"1"}"#).is_err());
    }

    #[test]
    fn test_visibility_serde() {
        assert_eq!(
            serde_json::to_string(&Visibility::Hidden).unwrap(),
            "\"hidden\""
        );
        assert!(Visibility::Visible.is_visible());
    }
}
