//! Three-state circuit breaker guarding the completion backend.
//!
//! Transitions:
//!
//! - `closed → open` after `failure_threshold` consecutive failures;
//!   while open, calls are refused without touching the network.
//! - `open → half-open` once `cooldown` has elapsed; probe calls are
//!   allowed through.
//! - `half-open → closed` after `success_threshold` consecutive probe
//!   successes; a probe failure snaps back to `open` and restarts the
//!   cooldown.
//! - Any success while `closed` resets the failure counter.
//!
//! Counters are not shared between states: both reset on every
//! transition.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls flow normally.
    Closed,
    /// Calls are refused.
    Open,
    /// Probe calls are allowed to test recovery.
    HalfOpen,
}

impl BreakerState {
    /// Lowercase label for logs and the status command.
    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half-open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker, for diagnostics.
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    /// Current state.
    pub state: BreakerState,
    /// Consecutive failures observed in the current closed period.
    pub failure_count: u32,
    /// Consecutive successes observed in the current half-open period.
    pub success_count: u32,
    /// Whether a call made right now would be allowed through.
    pub can_proceed: bool,
    /// Time since the most recent recorded failure.
    pub last_failure_age: Option<Duration>,
}

struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
}

/// The circuit breaker. Internally synchronized; share via `Arc`.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    failure_threshold: u32,
    success_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// Create a closed breaker with the given thresholds.
    pub fn new(failure_threshold: u32, success_threshold: u32, cooldown: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure_at: None,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            cooldown,
        }
    }

    /// Whether a call may proceed. Promotes `open` to `half-open` when
    /// the cooldown has elapsed.
    pub fn can_proceed(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.cooldown)
                    .unwrap_or(true);
                if cooled {
                    tracing::info!("circuit breaker half-open, allowing probe calls");
                    inner.state = BreakerState::HalfOpen;
                    inner.success_count = 0;
                    inner.failure_count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count = 0;
            }
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.success_threshold {
                    tracing::info!(
                        successes = inner.success_count,
                        "circuit breaker closed after successful probes"
                    );
                    inner.state = BreakerState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                }
            }
            // A success while open means the call raced the trip; the
            // cooldown still governs recovery.
            BreakerState::Open => {}
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.last_failure_at = Some(now);
        match inner.state {
            BreakerState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    tracing::warn!(
                        failures = inner.failure_count,
                        cooldown_secs = self.cooldown.as_secs(),
                        "circuit breaker open"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(now);
                    inner.success_count = 0;
                }
            }
            BreakerState::HalfOpen => {
                tracing::warn!("probe failed, circuit breaker re-open");
                inner.state = BreakerState::Open;
                inner.opened_at = Some(now);
                inner.failure_count = 0;
                inner.success_count = 0;
            }
            BreakerState::Open => {
                inner.opened_at = Some(now);
            }
        }
    }

    /// Current diagnostic snapshot.
    pub fn snapshot(&self) -> BreakerSnapshot {
        // can_proceed() may promote open -> half-open; call it first so
        // the snapshot reflects the promoted state.
        let can_proceed = self.can_proceed();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            can_proceed,
            last_failure_age: inner.last_failure_at.map(|at| at.elapsed()),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("CircuitBreaker")
            .field("state", &snapshot.state)
            .field("failure_count", &snapshot.failure_count)
            .field("success_count", &snapshot.success_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, 2, Duration::from_millis(50))
    }

    #[test]
    fn starts_closed() {
        let breaker = fast_breaker();
        assert!(breaker.can_proceed());
        assert_eq!(breaker.snapshot().state, BreakerState::Closed);
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = fast_breaker();
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.can_proceed(), "below threshold should stay closed");
        breaker.record_failure();
        assert!(!breaker.can_proceed());
        assert_eq!(breaker.snapshot().state, BreakerState::Open);
    }

    #[test]
    fn success_resets_failure_counter_while_closed() {
        let breaker = fast_breaker();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        // Only 2 consecutive failures since the success.
        assert!(breaker.can_proceed());
    }

    #[test]
    fn half_open_after_cooldown() {
        let breaker = fast_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert!(!breaker.can_proceed());

        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.can_proceed());
        assert_eq!(breaker.snapshot().state, BreakerState::HalfOpen);
    }

    #[test]
    fn closes_after_probe_successes() {
        let breaker = fast_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.can_proceed());

        breaker.record_success();
        assert_eq!(breaker.snapshot().state, BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.snapshot().state, BreakerState::Closed);
        assert!(breaker.can_proceed());
    }

    #[test]
    fn probe_failure_reopens_and_restarts_cooldown() {
        let breaker = fast_breaker();
        for _ in 0..3 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.can_proceed()); // half-open

        breaker.record_failure();
        assert_eq!(breaker.snapshot().state, BreakerState::Open);
        assert!(!breaker.can_proceed(), "cooldown restarted");

        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.can_proceed());
    }

    #[test]
    fn snapshot_fields() {
        let breaker = fast_breaker();
        breaker.record_failure();
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, BreakerState::Closed);
        assert_eq!(snapshot.failure_count, 1);
        assert!(snapshot.can_proceed);
        assert!(snapshot.last_failure_age.is_some());
    }

    #[test]
    fn state_labels() {
        assert_eq!(BreakerState::Closed.as_str(), "closed");
        assert_eq!(BreakerState::Open.to_string(), "open");
        assert_eq!(BreakerState::HalfOpen.as_str(), "half-open");
    }
}
