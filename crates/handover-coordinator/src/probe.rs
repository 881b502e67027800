//! Version probe
//!
//! Learns the server's published version from a small JSON descriptor without
//! touching the worker-update machinery. A probe is advisory: every failure
//! collapses to `None` and is logged.

use handover_core::effects::{HttpEffects, HttpRequest, PhysicalTimeEffects};
use handover_core::{HandoverError, HandoverResult, VersionDescriptor};
use std::sync::Arc;

/// Fetches the remote version descriptor
#[derive(Clone)]
pub struct VersionProbe {
    http: Arc<dyn HttpEffects>,
    time: Arc<dyn PhysicalTimeEffects>,
    version_url: String,
}

impl VersionProbe {
    /// Probe `version_url` (e.g. `https://host/app/version.json`)
    pub fn new(
        http: Arc<dyn HttpEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        version_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            time,
            version_url: version_url.into(),
        }
    }

    /// Descriptor URL without the cache-busting parameter
    pub fn version_url(&self) -> &str {
        &self.version_url
    }

    /// Request for a single probe, cache-busted with the current time
    pub fn request(&self) -> HttpRequest {
        let separator = if self.version_url.contains('?') { '&' } else { '?' };
        HttpRequest::get(format!(
            "{}{}t={}",
            self.version_url,
            separator,
            self.time.now_ms()
        ))
        .with_header("Cache-Control", "no-cache")
    }

    /// Fetch the published version once.
    ///
    /// Returns `None` on network failure, non-success status, or a body that is
    /// not a version descriptor.
    pub async fn probe_version(&self) -> Option<String> {
        match self.fetch_version().await {
            Ok(version) => {
                tracing::trace!(version = %version, "Version probe succeeded");
                Some(version)
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(url = %self.version_url, error = %e, "Version probe failed");
                None
            }
            Err(e) => {
                tracing::warn!(url = %self.version_url, error = %e, "Version probe failed");
                None
            }
        }
    }

    /// Fetch the published version once, reporting why it failed
    pub async fn fetch_version(&self) -> HandoverResult<String> {
        let response = self.http.get(self.request()).await?;
        if !response.is_success() {
            return Err(HandoverError::network(format!(
                "version descriptor returned status {}",
                response.status
            )));
        }
        let descriptor: VersionDescriptor = serde_json::from_slice(&response.body)?;
        Ok(descriptor.version)
    }
}

impl std::fmt::Debug for VersionProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionProbe")
            .field("version_url", &self.version_url)
            .finish_non_exhaustive()
    }
}
