//! Concurrency budget for fetch tasks.
//!
//! A `ConcurrencyLimiter` owns a counting semaphore of fixed capacity. Tasks
//! acquire a `Slot` before any network I/O and hold it until they finish.
//! The slot is released when it is dropped, so every exit path of a task
//! (success, error, early return, panic unwind) gives the permit back
//! exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of pages fetched at once
pub const DEFAULT_WORKERS: usize = 7;

#[derive(Debug, Clone, Copy, Error)]
#[error("concurrency limiter has been closed")]
pub struct LimiterClosed;

#[derive(Debug, Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Fixed-capacity gate in front of the network-bound part of each task
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ConcurrencyLimiter {
    /// Create a limiter admitting at most `capacity` holders (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<Slot, LimiterClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LimiterClosed)?;

        let counters = self.counters.clone();
        counters.acquired.fetch_add(1, Ordering::AcqRel);
        let now = counters.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        counters.peak.fetch_max(now, Ordering::AcqRel);

        Ok(Slot {
            _permit: permit,
            counters,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of slots held at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.counters.peak.load(Ordering::Acquire)
    }

    /// Total slots handed out
    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::Acquire)
    }

    /// Total slots given back
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::Acquire)
    }

    /// Free permits right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held concurrency slot; dropping it releases the slot
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        // Counters first: the permit is returned after this body runs
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.counters.released.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_release_on_drop() {
        let limiter = ConcurrencyLimiter::new(2);

        let a = limiter.acquire().await.unwrap();
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_flight(), 2);
        assert_eq!(limiter.available(), 0);

        drop(a);
        assert_eq!(limiter.in_flight(), 1);
        assert_eq!(limiter.available(), 1);

        drop(b);
        assert_eq!(limiter.in_flight(), 0);
        assert_eq!(limiter.acquired(), 2);
        assert_eq!(limiter.released(), 2);
        assert_eq!(limiter.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_free_slot() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(limiter.peak_in_flight(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(ConcurrencyLimiter::default().capacity(), DEFAULT_WORKERS);
    }
}
