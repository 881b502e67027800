//! Command handlers

pub mod config;
pub mod probe;
pub mod watch;

use anyhow::{bail, Context, Result};
use handover_coordinator::{CoordinatorConfig, VersionProbe};
use handover_effects::{RealTimeHandler, ReqwestHttpHandler};
use std::path::Path;
use std::sync::Arc;

/// Load the config file if present, then apply `HANDOVER_*` overrides
pub fn load_config(path: &Path) -> Result<CoordinatorConfig> {
    let mut config = if path.exists() {
        CoordinatorConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        tracing::debug!(path = %path.display(), "No config file; using defaults");
        CoordinatorConfig::default()
    };
    config
        .merge_with_env()
        .context("applying HANDOVER_* overrides")?;
    Ok(config)
}

/// Probe against a real deployment
pub fn http_probe(config: &CoordinatorConfig) -> Result<VersionProbe> {
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        bail!(
            "base_url must be an absolute http(s) URL to probe from the command line, got {:?}",
            config.base_url
        );
    }
    let http = ReqwestHttpHandler::new()?;
    Ok(VersionProbe::new(
        Arc::new(http),
        Arc::new(RealTimeHandler::new()),
        config.version_url(),
    ))
}
