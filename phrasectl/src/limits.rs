//! Concurrency control for transformer invocations.
//!
//! Every `/run_cpp` request that reaches the transformer holds a permit for the duration of the
//! invocation. With an external transformer that bounds the number of child processes alive at
//! once. Requests beyond the limit wait in a bounded queue and get HTTP 429 when the queue is full
//! or their wait times out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::TransformLimitsConfig;
use crate::errors::{Error, Result};

/// Controls how many transformer invocations run at once.
#[derive(Debug)]
pub struct TransformLimiter {
    /// Semaphore controlling max concurrent invocations
    semaphore: Arc<Semaphore>,
    /// Current number of requests waiting for a permit
    waiting_count: AtomicUsize,
    /// Maximum allowed waiting requests (None = unlimited)
    max_waiting: Option<usize>,
    /// Maximum time to wait for a permit
    max_wait: Duration,
}

impl TransformLimiter {
    /// Creates a limiter from configuration.
    ///
    /// If `max_concurrent` is 0, returns `None` (unlimited).
    /// If `max_waiting` is 0, unlimited waiting is allowed.
    pub fn new(config: &TransformLimitsConfig) -> Option<Self> {
        if config.max_concurrent == 0 {
            return None;
        }

        Some(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            waiting_count: AtomicUsize::new(0),
            max_waiting: if config.max_waiting == 0 { None } else { Some(config.max_waiting) },
            max_wait: config.max_wait,
        })
    }

    /// Waits for a free slot.
    ///
    /// Returns `Err(TooManyRequests)` if the waiting queue is full or the timeout expires first.
    pub async fn acquire(&self) -> Result<TransformPermit> {
        if let Some(permit) = self.try_acquire() {
            return Ok(permit);
        }

        let Some(_queued) = self.join_queue() else {
            return Err(rejected("Too many requests in progress. Please retry later."));
        };

        // A slot may have freed up while joining the queue
        if let Some(permit) = self.try_acquire() {
            return Ok(permit);
        }

        if self.max_wait.is_zero() {
            return Err(rejected("Too many requests in progress. Please retry later."));
        }

        match tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(TransformPermit { _permit: permit }),
            Ok(Err(_)) => Err(rejected("Service temporarily unavailable.")),
            Err(_) => Err(rejected("Timed out waiting for a free slot. Please retry later.")),
        }
    }

    fn try_acquire(&self) -> Option<TransformPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| TransformPermit { _permit: permit })
    }

    /// Take a place in the waiting queue, or `None` if it is full.
    fn join_queue(&self) -> Option<QueuePlace<'_>> {
        let ahead = self.waiting_count.fetch_add(1, Ordering::SeqCst);
        let place = QueuePlace {
            waiting_count: &self.waiting_count,
        };

        match self.max_waiting {
            // Dropping `place` gives the spot back
            Some(max_waiting) if ahead >= max_waiting => None,
            _ => Some(place),
        }
    }
}

fn rejected(message: &str) -> Error {
    Error::TooManyRequests {
        message: message.to_string(),
    }
}

/// A spot in the waiting queue, released on drop.
struct QueuePlace<'a> {
    waiting_count: &'a AtomicUsize,
}

impl Drop for QueuePlace<'_> {
    fn drop(&mut self) {
        self.waiting_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard that releases the slot when dropped.
#[must_use]
pub struct TransformPermit {
    _permit: OwnedSemaphorePermit,
}
