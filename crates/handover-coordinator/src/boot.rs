//! Boot-readiness signal
//!
//! The application shell marks the app as booted once initial render and the
//! critical data load are complete. The coordinator never swaps code before
//! that point. Waiters wake on the notification and additionally re-check at a
//! fixed cadence, logging while they wait.

use handover_core::effects::PhysicalTimeEffects;
use tokio::sync::watch;

/// One-shot, process-wide boot-complete flag
#[derive(Debug, Clone)]
pub struct BootSignal {
    sender: watch::Sender<bool>,
}

impl BootSignal {
    /// Create a signal that is not yet ready
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Create a signal that is already ready
    pub fn ready() -> Self {
        let signal = Self::new();
        signal.mark_ready();
        signal
    }

    /// Mark boot as complete. Idempotent.
    pub fn mark_ready(&self) {
        self.sender.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    /// Whether boot has completed
    pub fn is_ready(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until boot has completed, re-checking every `poll_ms`.
    ///
    /// Returns the number of re-checks that found the app still booting. There
    /// is no upper bound: an update is never forced mid-boot.
    pub async fn wait_ready(&self, time: &dyn PhysicalTimeEffects, poll_ms: u64) -> u32 {
        let mut receiver = self.sender.subscribe();
        let mut polls = 0u32;
        loop {
            if *receiver.borrow_and_update() {
                return polls;
            }
            tokio::select! {
                changed = receiver.changed() => {
                    if changed.is_err() {
                        // Sender is owned by `self`, so this cannot close while we wait.
                        return polls;
                    }
                }
                _ = time.sleep_ms(poll_ms) => {
                    polls = polls.saturating_add(1);
                    tracing::trace!(polls, "Still waiting for app boot");
                }
            }
        }
    }
}

impl Default for BootSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_effects::RealTimeHandler;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_ready_signal_returns_immediately() {
        let signal = BootSignal::ready();
        assert_eq!(signal.wait_ready(&RealTimeHandler::new(), 300).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_wakes_on_mark_ready() {
        let signal = BootSignal::new();
        let shell = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1_000)).await;
            shell.mark_ready();
        });

        let start = tokio::time::Instant::now();
        let polls = signal.wait_ready(&RealTimeHandler::new(), 300).await;

        assert!(signal.is_ready());
        assert_eq!(polls, 3);
        assert!(start.elapsed() >= Duration::from_millis(1_000));
        assert!(start.elapsed() < Duration::from_millis(1_200));
    }

    #[test]
    fn test_mark_ready_is_idempotent() {
        let signal = BootSignal::new();
        signal.mark_ready();
        signal.mark_ready();
        assert!(signal.is_ready());
    }
}
