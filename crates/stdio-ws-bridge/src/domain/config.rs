//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! `main.rs` builds it from CLI arguments and `BRIDGE_*` environment
//! variables; tests build it directly with [`BridgeConfig::new`].
//!
//! Keeping configuration a plain struct (no environment reads inside the
//! domain) lets the controller run in tests with millisecond intervals.

use std::time::Duration;

use bridge_core::domain::backoff::{DEFAULT_BASE_INTERVAL, DEFAULT_DECAY, DEFAULT_MAX_INTERVAL};
use bridge_core::BackoffPolicy;
use thiserror::Error;
use url::Url;

/// Default interval between heartbeat pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Default deadline for one WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Reasons a [`BridgeConfig`] is rejected before the bridge starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Only `ws://` and `wss://` endpoints can be dialled.
    #[error("unsupported URL scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),

    /// The backoff base must be positive.
    #[error("reconnect interval must be greater than zero")]
    ZeroReconnectInterval,

    /// The backoff ceiling cannot be below the base.
    #[error("max reconnect interval ({max:?}) is smaller than reconnect interval ({base:?})")]
    MaxBelowBase { base: Duration, max: Duration },

    /// The decay must be a finite number ≥ 1.0 so delays never shrink.
    #[error("reconnect decay must be a finite number >= 1.0, got {0}")]
    InvalidDecay(f64),

    /// An empty token would send `Authorization: Bearer ` with no credential.
    #[error("auth token is empty")]
    EmptyToken,

    /// A zero handshake deadline would fail every attempt.
    #[error("connect timeout must be greater than zero")]
    ZeroConnectTimeout,
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use stdio_ws_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::new("ws://127.0.0.1:8080/rpc".parse().unwrap());
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.reconnect_decay, 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// WebSocket endpoint to dial.
    pub url: Url,

    /// Bearer token attached as `Authorization: Bearer <token>` on every
    /// connection attempt, reconnects included.
    pub token: Option<String>,

    /// Delay before the first retry (backoff base).
    pub reconnect_interval: Duration,

    /// Ceiling for any single retry delay.
    pub max_reconnect_interval: Duration,

    /// Multiplier applied to the delay per consecutive failed attempt.
    pub reconnect_decay: f64,

    /// Interval between WebSocket pings while connected.  `Duration::ZERO`
    /// disables the heartbeat.
    pub heartbeat_interval: Duration,

    /// Deadline for one WebSocket handshake.
    pub connect_timeout: Duration,

    /// Enables debug-level logging when `RUST_LOG` is not set.
    pub debug: bool,
}

impl BridgeConfig {
    /// Creates a configuration for `url` with every other field defaulted.
    ///
    /// | Field                  | Default   |
    /// |------------------------|-----------|
    /// | token                  | none      |
    /// | reconnect_interval     | 1000 ms   |
    /// | max_reconnect_interval | 30000 ms  |
    /// | reconnect_decay        | 1.5       |
    /// | heartbeat_interval     | 30000 ms  |
    /// | connect_timeout        | 10000 ms  |
    /// | debug                  | false     |
    pub fn new(url: Url) -> Self {
        Self {
            url,
            token: None,
            reconnect_interval: DEFAULT_BASE_INTERVAL,
            max_reconnect_interval: DEFAULT_MAX_INTERVAL,
            reconnect_decay: DEFAULT_DECAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            debug: false,
        }
    }

    /// The reconnect delay curve described by this configuration.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.reconnect_interval,
            self.reconnect_decay,
            self.max_reconnect_interval,
        )
    }

    /// Checks the invariants the connection engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
        if self.reconnect_interval.is_zero() {
            return Err(ConfigError::ZeroReconnectInterval);
        }
        if self.max_reconnect_interval < self.reconnect_interval {
            return Err(ConfigError::MaxBelowBase {
                base: self.reconnect_interval,
                max: self.max_reconnect_interval,
            });
        }
        if !self.reconnect_decay.is_finite() || self.reconnect_decay < 1.0 {
            return Err(ConfigError::InvalidDecay(self.reconnect_decay));
        }
        if matches!(self.token.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ConfigError::EmptyToken);
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroConnectTimeout);
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
