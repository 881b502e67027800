//! Coordinator configuration
//!
//! Loaded from TOML, overridable from `HANDOVER_*` environment variables, and
//! validated before a coordinator is built. Every field has a default, so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path that failed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid config field `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Update coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Base URL the app is served from; must end with `/` when non-empty
    pub base_url: String,

    /// Name of the version descriptor resource under `base_url`
    pub version_resource: String,

    /// Update-worker script URL passed to the registrar
    pub worker_script_url: String,

    /// Compiled-in application version compared against the probe result
    pub app_version: String,

    /// Bound on the waiting-worker version handshake
    pub handshake_timeout_ms: u64,

    /// Boot-readiness re-check cadence before auto-applying an update
    pub auto_apply_poll_ms: u64,

    /// Boot-readiness re-check cadence before reloading
    pub reload_poll_ms: u64,

    /// Interval between periodic registration re-polls
    pub update_poll_interval_secs: u64,

    /// Consecutive activations without a verified version change before the
    /// decision policy starts deferring. Zero disables the ceiling.
    pub max_unverified_activations: u32,

    /// Skip activation entirely (benchmarks and automated test environments)
    pub suppress_activation: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            base_url: "/".to_string(),
            version_resource: "version.json".to_string(),
            worker_script_url: "sw.js".to_string(),
            app_version: String::new(),
            handshake_timeout_ms: 1_500,
            auto_apply_poll_ms: 300,
            reload_poll_ms: 200,
            update_poll_interval_secs: 60 * 60,
            max_unverified_activations: 3,
            suppress_activation: false,
        }
    }
}

impl CoordinatorConfig {
    /// Configuration for a given deploy base URL and app version
    pub fn for_app(base_url: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            app_version: app_version.into(),
            ..Self::default()
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `HANDOVER_BASE_URL`, `HANDOVER_APP_VERSION` and
    /// `HANDOVER_SUPPRESS_ACTIVATION` overrides
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "HANDOVER_BASE_URL" => self.base_url = value,
                "HANDOVER_APP_VERSION" => self.app_version = value,
                "HANDOVER_SUPPRESS_ACTIVATION" => {
                    self.suppress_activation = matches!(value.as_str(), "1" | "true" | "yes");
                }
                _ => {}
            }
        }
        self.validate()
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.is_empty() && !self.base_url.ends_with('/') {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("must end with '/', got {:?}", self.base_url),
            });
        }
        if self.version_resource.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "version_resource",
                reason: "must not be empty".to_string(),
            });
        }
        if self.worker_script_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "worker_script_url",
                reason: "must not be empty".to_string(),
            });
        }
        let positive = [
            ("handshake_timeout_ms", self.handshake_timeout_ms),
            ("auto_apply_poll_ms", self.auto_apply_poll_ms),
            ("reload_poll_ms", self.reload_poll_ms),
            ("update_poll_interval_secs", self.update_poll_interval_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// URL of the version descriptor, without the cache-busting parameter
    pub fn version_url(&self) -> String {
        format!("{}{}", self.base_url, self.version_resource)
    }

    /// Periodic re-poll interval in milliseconds
    pub fn update_poll_interval_ms(&self) -> u64 {
        self.update_poll_interval_secs.saturating_mul(1_000)
    }
}
