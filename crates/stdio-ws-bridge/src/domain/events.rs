//! Lifecycle notifications published by the bridge.
//!
//! These are best-effort signals for the embedding process (the binary logs
//! them).  They travel on a broadcast channel that is separate from the
//! relay's data path, so a slow or absent subscriber never delays a frame,
//! and they carry no ordering guarantee relative to queued-message flushes.

use std::fmt;

/// One lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The WebSocket opened.
    Connected {
        /// Endpoint that accepted the connection.
        url: String,
    },
    /// An open WebSocket closed.  Failed attempts report `Error` only.
    Disconnected,
    /// A transport-level failure (connect failure or runtime error event).
    Error {
        /// Human-readable description.
        details: String,
    },
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { url } => write!(f, "connected to {url}"),
            Self::Disconnected => f.write_str("disconnected"),
            Self::Error { details } => write!(f, "error: {details}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_connected_includes_url() {
        let event = BridgeEvent::Connected {
            url: "ws://localhost:1/".to_string(),
        };
        assert_eq!(event.to_string(), "connected to ws://localhost:1/");
    }

    #[test]
    fn test_display_error_includes_details() {
        let event = BridgeEvent::Error {
            details: "connection refused".to_string(),
        };
        assert_eq!(event.to_string(), "error: connection refused");
    }
}
