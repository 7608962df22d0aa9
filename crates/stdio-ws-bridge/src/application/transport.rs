//! Transport port: what the connection controller needs from a WebSocket.
//!
//! The controller never touches a socket.  It asks a [`Connector`] for a
//! [`WsLink`] and then talks to the link through two channels:
//!
//! ```text
//! controller ── OutboundFrame (text / ping / close) ──▶ socket driver
//! controller ◀── LinkEvent (message / pong / error / closed) ── socket driver
//! ```
//!
//! The infrastructure layer provides the tokio-tungstenite implementation;
//! tests drive the far end of [`link_pair`] by hand.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bridge_core::{encode_frame, DeliverySink, StructuredMessage};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// How long [`WsLink::close`] waits for the socket driver to finish.
pub const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Errors from opening or using a WebSocket link.
///
/// None of these are fatal: every variant feeds the reconnect path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The URL or auth header could not be turned into a handshake request.
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),

    /// TCP connect, TLS or the WebSocket handshake failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The handshake did not complete within the configured deadline.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The link is no longer writable.
    #[error("link closed")]
    Closed,
}

/// Parameters for one connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Endpoint to dial.
    pub url: String,
    /// Bearer credential, sent on every attempt.
    pub bearer_token: Option<String>,
}

impl ConnectRequest {
    /// Value for the `Authorization` header, if a token is configured.
    pub fn authorization(&self) -> Option<String> {
        self.bearer_token
            .as_deref()
            .map(|token| format!("Bearer {token}"))
    }
}

impl fmt::Debug for ConnectRequest {
    // Tokens must never reach the logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("url", &self.url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Opens WebSocket links.
///
/// Infrastructure implementations use tokio-tungstenite; test
/// implementations hand out scripted links.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs one connection attempt.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`]; the controller treats all of them as a
    /// failed attempt and schedules a retry.
    async fn connect(&self, request: &ConnectRequest) -> Result<WsLink, TransportError>;
}

/// A frame the controller asks the socket driver to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// One encoded JSON-RPC frame.
    Text(String),
    /// Liveness probe (WebSocket ping control frame).
    Ping,
    /// Close handshake; the driver exits after sending it.
    Close,
}

/// Something the socket driver observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A text frame (one JSON-RPC frame, not yet decoded).
    Message(String),
    /// Reply to a ping.
    Pong,
    /// Runtime error.  Informational; the `Closed` that follows drives the
    /// state change.
    Error(String),
    /// The socket is gone.
    Closed {
        /// Close reason, when the peer gave one.
        reason: Option<String>,
    },
}

/// Controller-side handle to one open WebSocket.
#[derive(Debug)]
pub struct WsLink {
    id: Uuid,
    outgoing: mpsc::UnboundedSender<OutboundFrame>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    driver: Option<JoinHandle<()>>,
}

/// Driver-side end of a [`WsLink`].
#[derive(Debug)]
pub struct LinkPeer {
    /// Frames the controller wants written.
    pub frames: mpsc::UnboundedReceiver<OutboundFrame>,
    /// Where the driver reports what it observed.
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

/// Creates a connected link/peer pair with a fresh link id.
pub fn link_pair() -> (WsLink, LinkPeer) {
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let link = WsLink {
        id: Uuid::new_v4(),
        outgoing: frames_tx,
        events: events_rx,
        driver: None,
    };
    let peer = LinkPeer {
        frames: frames_rx,
        events: events_tx,
    };
    (link, peer)
}

impl WsLink {
    /// Attaches the task that pumps the real socket, so [`WsLink::close`]
    /// can wait for the close handshake to be written.
    pub fn with_driver(mut self, driver: JoinHandle<()>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Identifier used in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The `readyState == OPEN` check: `true` while the driver accepts frames.
    pub fn is_writable(&self) -> bool {
        !self.outgoing.is_closed()
    }

    /// Queues one encoded frame for the socket.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] when the driver has gone away.
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.outgoing
            .send(OutboundFrame::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    /// Sends a liveness ping.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] when the driver has gone away.
    pub fn ping(&self) -> Result<(), TransportError> {
        self.outgoing
            .send(OutboundFrame::Ping)
            .map_err(|_| TransportError::Closed)
    }

    /// Waits for the next driver event.  A vanished driver reads as `Closed`.
    pub async fn next_event(&mut self) -> LinkEvent {
        self.events
            .recv()
            .await
            .unwrap_or(LinkEvent::Closed { reason: None })
    }

    /// Starts the close handshake and waits (bounded by [`CLOSE_GRACE`]) for
    /// the driver to finish writing it.
    pub async fn close(self) {
        let Self {
            id,
            outgoing,
            driver,
            ..
        } = self;
        let _ = outgoing.send(OutboundFrame::Close);
        drop(outgoing);

        if let Some(mut driver) = driver {
            if tokio::time::timeout(CLOSE_GRACE, &mut driver).await.is_err() {
                debug!("link {id}: driver did not finish within {CLOSE_GRACE:?}; aborting");
                driver.abort();
            }
        }
    }
}

impl DeliverySink<StructuredMessage> for WsLink {
    fn try_send(&mut self, message: StructuredMessage) -> Result<(), StructuredMessage> {
        if !self.is_writable() {
            return Err(message);
        }
        match self.send_text(encode_frame(&message)) {
            Ok(()) => Ok(()),
            Err(_) => Err(message),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
