//! `handover watch`

use anyhow::Result;
use handover_coordinator::CoordinatorConfig;
use std::time::Duration;

/// Probe on an interval and log each change of the published version
pub async fn run(config: CoordinatorConfig, interval: Option<u64>, count: Option<u32>) -> Result<()> {
    let probe = super::http_probe(&config)?;
    let period = Duration::from_secs(interval.unwrap_or(config.update_poll_interval_secs).max(1));

    tracing::info!(
        url = %probe.version_url(),
        interval_secs = period.as_secs(),
        "Watching published version"
    );

    let mut ticker = tokio::time::interval(period);
    let mut last: Option<String> = None;
    let mut probes = 0u32;

    loop {
        ticker.tick().await;
        let current = probe.probe_version().await;
        probes = probes.saturating_add(1);

        match (&last, &current) {
            (_, None) => tracing::warn!("Published version unavailable"),
            (None, Some(version)) => tracing::info!(version = %version, "Published version"),
            (Some(previous), Some(version)) if previous != version => {
                tracing::info!(from = %previous, to = %version, "Published version changed");
            }
            _ => tracing::debug!("Published version unchanged"),
        }
        if current.is_some() {
            last = current;
        }

        if count.is_some_and(|limit| probes >= limit) {
            break;
        }
    }

    Ok(())
}
