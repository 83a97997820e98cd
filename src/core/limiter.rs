//! Bounded-permit gate for outbound provider calls.
//!
//! The limiter is the only deliberately contended resource in the gateway: every
//! cache miss must hold a [`LimiterPermit`] while it talks to the synthesis
//! provider. Permits are returned when dropped, so a cancelled or timed-out
//! request frees its slot immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound accepted for the permit pool size.
pub const MAX_PERMITS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    #[error("max_concurrent must be between 1 and {MAX_PERMITS}, got {0}")]
    InvalidCapacity(usize),

    #[error("Concurrency limiter is closed")]
    Closed,
}

/// Counters describing limiter behaviour.
#[derive(Debug, Default)]
pub struct LimiterMetrics {
    /// Total permits handed out
    pub total_acquired: AtomicU64,
    /// Permits currently held
    pub in_flight: AtomicUsize,
    /// Highest number of permits held at once
    pub peak_in_flight: AtomicUsize,
    /// Cumulative time callers spent waiting for a permit, in microseconds
    pub total_wait_us: AtomicU64,
}

impl LimiterMetrics {
    pub fn summary(&self) -> String {
        format!(
            "Permits - Acquired: {}, In flight: {}, Peak: {}",
            self.total_acquired.load(Ordering::Relaxed),
            self.in_flight.load(Ordering::Relaxed),
            self.peak_in_flight.load(Ordering::Relaxed),
        )
    }
}

/// Caps simultaneous calls to the synthesis provider.
pub struct ConcurrencyLimiter {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    metrics: Arc<LimiterMetrics>,
}

/// A held permit. Dropping it releases the slot.
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    metrics: Arc<LimiterMetrics>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        self.metrics.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize) -> Result<Self, LimiterError> {
        if max_concurrent == 0 || max_concurrent > MAX_PERMITS {
            return Err(LimiterError::InvalidCapacity(max_concurrent));
        }

        Ok(Self {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            metrics: Arc::new(LimiterMetrics::default()),
        })
    }

    /// Waits until a permit is free.
    ///
    /// This is a suspension point; callers bound the wait with their own
    /// request deadline (see `tokio::time::timeout_at`).
    pub async fn acquire(&self) -> Result<LimiterPermit, LimiterError> {
        let wait_start = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LimiterError::Closed)?;

        self.metrics
            .total_wait_us
            .fetch_add(wait_start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
        let active = self.metrics.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_in_flight
            .fetch_max(active, Ordering::Relaxed);

        Ok(LimiterPermit {
            _permit: permit,
            metrics: Arc::clone(&self.metrics),
        })
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.metrics.in_flight.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.metrics.peak_in_flight.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &LimiterMetrics {
        &self.metrics
    }
}
