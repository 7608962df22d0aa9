//! Reconnect scheduler: owns the attempt counter and the single retry timer.
//!
//! Delays come from [`BackoffPolicy`] indexed by the attempt counter.  The
//! counter goes back to zero on every successful connection and goes up by
//! one for every retry scheduled.  At most one retry is pending at a time:
//! scheduling again while one is pending returns the pending delay and
//! changes nothing.

use std::pin::Pin;
use std::time::Duration;

use bridge_core::BackoffPolicy;
use tokio::time::{self, Instant, Sleep};

#[derive(Debug)]
struct PendingRetry {
    delay: Duration,
    sleep: Pin<Box<Sleep>>,
}

/// Backoff state plus the one pending retry timer.
#[derive(Debug)]
pub struct ReconnectScheduler {
    policy: BackoffPolicy,
    attempts: u32,
    pending: Option<PendingRetry>,
}

impl ReconnectScheduler {
    /// Creates a scheduler with the counter at zero and nothing pending.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            pending: None,
        }
    }

    /// Arms the retry timer for the current attempt number and returns its
    /// delay.
    ///
    /// If a retry is already pending this is a no-op that returns the
    /// existing delay; the counter does not move.
    pub fn schedule_next(&mut self) -> Duration {
        if let Some(pending) = &self.pending {
            return pending.delay;
        }
        let delay = self.policy.delay_for(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        self.pending = Some(PendingRetry {
            delay,
            sleep: Box::pin(time::sleep_until(Instant::now() + delay)),
        });
        delay
    }

    /// Clears the pending retry, if any.  The counter is left alone.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Resets the counter after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Retries scheduled since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `true` while a retry timer is armed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Delay of the pending retry, if any.
    pub fn pending_delay(&self) -> Option<Duration> {
        self.pending.as_ref().map(|p| p.delay)
    }

    /// Resolves when the pending retry is due, and disarms it.
    ///
    /// Pends forever when nothing is scheduled.  Cancel-safe: dropping the
    /// future before it resolves leaves the retry pending.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.sleep.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_retries_follow_backoff_curve() {
        // Arrange
        let mut scheduler = ReconnectScheduler::new(BackoffPolicy::default());
        let mut delays = Vec::new();

        // Act: schedule, let it fire, schedule again (no successful connect)
        for _ in 0..4 {
            delays.push(scheduler.schedule_next());
            scheduler.fired().await;
        }

        // Assert
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(2250),
                Duration::from_millis(3375),
            ]
        );
        assert_eq!(scheduler.attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_schedule_keeps_single_pending_timer() {
        // Arrange
        let mut scheduler = ReconnectScheduler::new(BackoffPolicy::default());

        // Act
        let first = scheduler.schedule_next();
        let second = scheduler.schedule_next();

        // Assert: same delay, counter advanced once, one timer
        assert_eq!(first, second);
        assert_eq!(scheduler.attempts(), 1);
        assert!(scheduler.is_pending());

        let started = Instant::now();
        scheduler.fired().await;
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restarts_curve_at_attempt_zero() {
        let mut scheduler = ReconnectScheduler::new(BackoffPolicy::default());
        for _ in 0..5 {
            scheduler.schedule_next();
            scheduler.fired().await;
        }

        scheduler.reset();

        assert_eq!(scheduler.schedule_next(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_retry_never_fires() {
        // Arrange
        let mut scheduler = ReconnectScheduler::new(BackoffPolicy::default());
        scheduler.schedule_next();

        // Act
        scheduler.cancel();
        let mut fired = task::spawn(scheduler.fired());
        time::advance(Duration::from_secs(120)).await;

        // Assert
        assert_pending!(fired.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_wait_leaves_retry_pending() {
        let mut scheduler = ReconnectScheduler::new(BackoffPolicy::default());
        scheduler.schedule_next();

        {
            let mut fired = task::spawn(scheduler.fired());
            assert_pending!(fired.poll());
        }
        assert!(scheduler.is_pending());
        assert_eq!(scheduler.pending_delay(), Some(Duration::from_millis(1000)));

        time::advance(Duration::from_millis(1000)).await;
        let mut fired = task::spawn(scheduler.fired());
        assert_ready!(fired.poll());
    }
}
