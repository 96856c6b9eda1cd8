//! Token-bucket rate limiter for outgoing AI calls.
//!
//! One bucket serializes all calls in the process (the bulk runner's
//! workers share it). The bucket refills continuously at
//! `refill_per_sec` tokens per second up to `capacity`; a caller takes
//! one token per call and waits, cancellation-aware, when the bucket is
//! empty.
//!
//! The mutex is only ever held to read/update the token count — never
//! across an await point — so contention stays in the nanosecond range.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};

/// Mutable bucket state.
struct BucketState {
    /// Fractional tokens currently available.
    tokens: f64,
    /// When the bucket was last refilled.
    last_refill: Instant,
}

/// An asynchronous token bucket.
pub struct TokenBucket {
    state: Mutex<BucketState>,
    refill_per_sec: f64,
    capacity: f64,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    ///
    /// `refill_per_sec` values at or below zero disable refill entirely
    /// after the initial burst is spent; the engine config never does
    /// that, but the bucket stays well-defined.
    pub fn new(refill_per_sec: f64, capacity: u32) -> Self {
        let capacity = f64::from(capacity.max(1));
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            refill_per_sec: refill_per_sec.max(0.0),
            capacity,
        }
    }

    /// Take one token, waiting for refill if necessary.
    ///
    /// Returns [`GatewayError::Cancelled`] if `cancel` fires while
    /// waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(GatewayError::Cancelled);
            }

            let wait = match self.try_take() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            tokio::select! {
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Take one token without waiting. Returns `true` on success.
    pub fn try_acquire(&self) -> bool {
        self.try_take().is_ok()
    }

    /// Tokens currently available (after refill), for diagnostics.
    pub fn available(&self) -> f64 {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);
        state.tokens
    }

    /// Attempt to take one token; on failure returns how long to wait
    /// before one becomes available.
    fn try_take(&self) -> std::result::Result<(), Duration> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        if self.refill_per_sec <= 0.0 {
            // No refill configured: wait a beat and re-check (another
            // path may return tokens in a future revision).
            return Err(Duration::from_millis(100));
        }

        let deficit = 1.0 - state.tokens;
        Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
            state.last_refill = now;
        }
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("refill_per_sec", &self.refill_per_sec)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}
