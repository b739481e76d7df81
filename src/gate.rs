use crate::error::Result;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_CAPACITY: usize = 3;

/// Process-wide cap on simultaneous downloads.
///
/// Cloning shares the same slots. Waiters are admitted in FIFO order.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One admission slot. Released when dropped, on every exit path.
#[derive(Debug)]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// A zero capacity is raised to one so the gate can never deadlock.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot.
    ///
    /// # Errors
    ///
    /// Returns `Error::GateClosed` if the gate was shut down.
    pub async fn acquire(&self) -> Result<Permit> {
        let inner = Arc::clone(&self.semaphore).acquire_owned().await?;
        Ok(Permit { _inner: inner })
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
