//! Heartbeat monitor: periodic WebSocket pings while connected.
//!
//! The monitor owns at most one interval timer.  It is armed on entry to
//! `Connected` and disarmed on every exit and on shutdown.  Pongs are
//! recorded so a silent peer shows up in debug logs, but a missing pong
//! never forces a reconnect: the socket's own close/error events are the
//! only failure signal.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Single-timer ping scheduler.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    period: Duration,
    timer: Option<Interval>,
    awaiting_pong: bool,
    last_pong: Option<Instant>,
    probes_sent: u64,
}

impl HeartbeatMonitor {
    /// Creates a disarmed monitor.  A zero `period` disables it entirely.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            timer: None,
            awaiting_pong: false,
            last_pong: None,
            probes_sent: 0,
        }
    }

    /// `false` when configured with a zero period.
    pub fn is_enabled(&self) -> bool {
        !self.period.is_zero()
    }

    /// `true` while a probe cycle is scheduled.
    pub fn is_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Arms the timer; the first probe fires one full period from now.
    ///
    /// A no-op while already armed (single-timer invariant) or when
    /// disabled.  Returns `true` if this call armed the timer.
    pub fn start(&mut self) -> bool {
        if self.timer.is_some() || !self.is_enabled() {
            return false;
        }
        let mut timer = time::interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        self.awaiting_pong = false;
        true
    }

    /// Cancels pending probes immediately.
    pub fn stop(&mut self) {
        self.timer = None;
        self.awaiting_pong = false;
    }

    /// Resolves at the next probe time.  Pends forever while disarmed, so it
    /// can sit in a `select!` unconditionally.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Notes that a probe was sent.  Returns `true` if the previous probe
    /// never got a pong.
    pub fn record_probe(&mut self) -> bool {
        let unanswered = self.awaiting_pong;
        self.awaiting_pong = true;
        self.probes_sent += 1;
        unanswered
    }

    /// Notes that a pong arrived.
    pub fn record_pong(&mut self) {
        self.awaiting_pong = false;
        self.last_pong = Some(Instant::now());
    }

    /// When the last pong arrived, if ever.
    pub fn last_pong(&self) -> Option<Instant> {
        self.last_pong
    }

    /// Total probes sent over the monitor's lifetime.
    pub fn probes_sent(&self) -> u64 {
        self.probes_sent
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
