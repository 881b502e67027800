//! Time effect interface
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `handover-effects::RealTimeHandler`
//! - **Usage**: probe cache-busting, handshake timeout, boot re-check cadence,
//!   periodic update polling

use async_trait::async_trait;
use std::sync::Arc;

/// Wall-clock time and cooperative sleeping
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;

    /// Suspend the calling task for `ms` milliseconds
    async fn sleep_ms(&self, ms: u64);
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for Arc<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await;
    }
}
