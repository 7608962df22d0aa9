//! Exponential backoff between reconnect attempts.
//!
//! The delay before retry `n` (0-based) is:
//!
//! ```text
//! delay(n) = min(base * decay^n, max)
//! ```
//!
//! With the defaults (1000 ms, 1.5, 30000 ms) that gives
//! 1000, 1500, 2250, 3375, 5062.5, … ms, clamped at 30 s.  The curve is
//! deterministic (no jitter): the same attempt number always yields the
//! same delay.

use std::time::Duration;

/// Default delay before the first retry.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(1000);

/// Default multiplier applied per attempt.
pub const DEFAULT_DECAY: f64 = 1.5;

/// Default ceiling for any single delay.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(30_000);

/// Parameters of the reconnect delay curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    decay: f64,
    max: Duration,
}

impl BackoffPolicy {
    /// Creates a policy from its three parameters.
    ///
    /// Validation (decay ≥ 1, max ≥ base) is the configuration layer's job;
    /// this type only guarantees it never panics for odd inputs.
    pub fn new(base: Duration, decay: f64, max: Duration) -> Self {
        Self { base, decay, max }
    }

    /// Delay before the first retry.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Per-attempt multiplier.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Upper bound on any delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns the delay to wait before retry number `attempt`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use bridge_core::BackoffPolicy;
    ///
    /// let policy = BackoffPolicy::default();
    /// assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(3375));
    /// assert_eq!(policy.delay_for(50), Duration::from_secs(30));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Exponents past i32::MAX overflow to infinity anyway.
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.decay.powi(exponent);

        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else if secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

impl Default for BackoffPolicy {
    /// | Parameter | Default   |
    /// |-----------|-----------|
    /// | base      | 1000 ms   |
    /// | decay     | 1.5       |
    /// | max       | 30000 ms  |
    fn default() -> Self {
        Self::new(DEFAULT_BASE_INTERVAL, DEFAULT_DECAY, DEFAULT_MAX_INTERVAL)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
