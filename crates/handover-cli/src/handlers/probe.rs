//! `handover probe`

use anyhow::{bail, Context, Result};
use handover_coordinator::CoordinatorConfig;

/// Fetch the published version once and compare it with the running version
pub async fn run(
    mut config: CoordinatorConfig,
    base_url: Option<String>,
    app_version: Option<String>,
) -> Result<()> {
    if let Some(mut base_url) = base_url {
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        config.base_url = base_url;
    }
    if let Some(app_version) = app_version {
        config.app_version = app_version;
    }
    config.validate().context("invalid probe target")?;

    let probe = super::http_probe(&config)?;
    tracing::debug!(url = %probe.version_url(), "Probing published version");

    let Some(published) = probe.probe_version().await else {
        bail!("{} is unreachable or not a version descriptor", probe.version_url());
    };

    println!("published: {published}");
    println!("{}", describe(&config.app_version, &published));
    Ok(())
}

fn describe(running: &str, published: &str) -> String {
    if running.is_empty() {
        "running: unknown".to_string()
    } else if running == published {
        format!("running: {running} (up to date)")
    } else {
        format!("running: {running} (update available)")
    }
}
