//! Layer 3: Time Effect Handler - Production Only
//!
//! Delegates to the system clock and tokio timers. Under a paused tokio clock
//! (`tokio::time::pause`) sleeps advance virtual time, which is how the
//! coordinator tests drive timeouts deterministically.

use async_trait::async_trait;
use handover_core::effects::PhysicalTimeEffects;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Real time handler for production use
#[derive(Debug, Clone, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    #[allow(clippy::disallowed_methods)]
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ms_is_after_2020() {
        let handler = RealTimeHandler::new();
        assert!(handler.now_ms() > 1_577_836_800_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_ms_advances_paused_clock() {
        let handler = RealTimeHandler::new();
        let start = tokio::time::Instant::now();

        handler.sleep_ms(1500).await;

        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
