//! Bounded concurrency limiter
//!
//! Caps simultaneous in-flight provider calls independently of pacing.
//! Permits are RAII guards, so every acquire is matched by exactly one
//! release even when the protected call errors or the caller is
//! cancelled mid-flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permit for one in-flight call. Dropping it releases the slot.
pub struct InFlightPermit {
    _permit: OwnedSemaphorePermit,
}

/// Counting semaphore over in-flight provider calls
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    permits_total: usize,
}

impl ConcurrencyLimiter {
    pub fn new(permits_total: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(permits_total)),
            permits_total,
        }
    }

    pub fn permits_total(&self) -> usize {
        self.permits_total
    }

    /// Permits not currently held, for the stats snapshot.
    pub fn permits_available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait up to `timeout` for a free slot. Returns `None` on timeout
    /// so the caller can map starvation to its own error kind.
    pub async fn acquire(&self, timeout: Duration) -> Option<InFlightPermit> {
        let acquired =
            tokio::time::timeout(timeout, Arc::clone(&self.semaphore).acquire_owned()).await;

        match acquired {
            Ok(Ok(permit)) => Some(InFlightPermit { _permit: permit }),
            // The semaphore is never closed while the limiter is alive
            Ok(Err(_)) => None,
            Err(_) => None,
        }
    }
}
