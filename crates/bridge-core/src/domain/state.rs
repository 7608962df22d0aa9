//! WebSocket connection state.

use std::fmt;

/// Where the bridge is in its connect/disconnect cycle.
///
/// Exactly one instance exists, owned by the connection controller.
///
/// ```text
/// Disconnected ──start / retry──▶ Connecting ──open ok──▶ Connected
///      ▲                             │                       │
///      └──────── open failed ────────┘◀──── close / error ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket and no attempt in flight.  A retry may be pending.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The socket is open; heartbeats run and the queue drains.
    Connected,
}

impl ConnectionState {
    /// Returns `true` only in [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Lower-case name used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
