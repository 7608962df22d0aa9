//! WebSocket client: the tokio-tungstenite implementation of [`Connector`].
//!
//! Each successful connection gets one driver task.  The driver owns the
//! socket and is the only code that reads or writes it:
//!
//! - frames from the controller ([`OutboundFrame`]) are written in order,
//! - everything read from the socket is reported back as a [`LinkEvent`],
//! - when the socket ends, a final `LinkEvent::Closed` is sent.
//!
//! The controller never sees a tungstenite type.
//!
//! # TLS
//!
//! `wss://` URLs go through rustls with the webpki root store (the
//! `rustls-tls-webpki-roots` feature of tokio-tungstenite).  No system
//! certificate store is consulted.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{self, timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::transport::{
    link_pair, ConnectRequest, Connector, LinkEvent, LinkPeer, OutboundFrame, TransportError,
    WsLink, CLOSE_GRACE,
};
use crate::domain::BridgeConfig;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Connector ─────────────────────────────────────────────────────────────────

/// Dials real WebSocket endpoints.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// Creates a connector whose handshakes give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Creates a connector using the configured handshake deadline.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.connect_timeout)
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, request: &ConnectRequest) -> Result<WsLink, TransportError> {
        let handshake = build_request(request)?;

        let (socket, response) = match timeout(self.connect_timeout, connect_async(handshake)).await
        {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
            Err(_) => return Err(TransportError::Timeout(self.connect_timeout)),
        };

        let (link, peer) = link_pair();
        let id = link.id();
        debug!(
            "link {id}: handshake with {} complete (HTTP {})",
            request.url,
            response.status()
        );

        let driver = tokio::spawn(drive_socket(socket, peer, id));
        Ok(link.with_driver(driver))
    }
}

/// Turns a [`ConnectRequest`] into a handshake request, adding the
/// `Authorization` header when a token is configured.
///
/// # Errors
///
/// [`TransportError::InvalidRequest`] when the URL cannot be dialled or the
/// token contains bytes not allowed in a header.
pub fn build_request(request: &ConnectRequest) -> Result<Request, TransportError> {
    let mut handshake = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    if let Some(value) = request.authorization() {
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            TransportError::InvalidRequest("auth token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        handshake.headers_mut().insert(AUTHORIZATION, value);
    }

    Ok(handshake)
}

// ── Socket driver ─────────────────────────────────────────────────────────────

/// Pumps one socket until it closes, then reports `Closed`.
///
/// After the controller asks for a close (or drops its link) the driver
/// sends a Close frame and keeps reading for at most [`CLOSE_GRACE`] so the
/// peer's reply can complete the handshake.
async fn drive_socket(socket: Socket, peer: LinkPeer, id: Uuid) {
    let LinkPeer { mut frames, events } = peer;
    let (mut sink, mut stream) = socket.split();
    let mut close_reason: Option<String> = None;
    let mut close_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            frame = frames.recv(), if close_deadline.is_none() => {
                let outgoing = match frame {
                    Some(OutboundFrame::Text(text)) => WsMessage::Text(text),
                    Some(OutboundFrame::Ping) => WsMessage::Ping(Vec::new()),
                    Some(OutboundFrame::Close) | None => {
                        debug!("link {id}: sending close frame");
                        close_deadline = Some(Instant::now() + CLOSE_GRACE);
                        WsMessage::Close(None)
                    }
                };
                if let Err(e) = sink.send(outgoing).await {
                    if close_deadline.is_none() {
                        warn!("link {id}: write failed: {e}");
                        let _ = events.send(LinkEvent::Error(e.to_string()));
                    }
                    break;
                }
            }

            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(LinkEvent::Message(text));
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        let _ = events.send(LinkEvent::Message(text));
                    }
                    Err(_) => warn!("link {id}: ignoring binary frame that is not UTF-8"),
                },
                Some(Ok(WsMessage::Pong(_))) => {
                    let _ = events.send(LinkEvent::Pong);
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    // tungstenite queues the pong reply itself.
                    debug!("link {id}: ping from peer ({} bytes)", data.len());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    close_reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty());
                    debug!("link {id}: close frame received");
                }
                Some(Ok(WsMessage::Frame(_))) => {}
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => break,
                Some(Err(e)) => {
                    if close_deadline.is_none() {
                        warn!("link {id}: read failed: {e}");
                        let _ = events.send(LinkEvent::Error(e.to_string()));
                    }
                    break;
                }
            },

            () = time::sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                debug!("link {id}: peer did not answer close within {CLOSE_GRACE:?}");
                break;
            }
        }
    }

    debug!("link {id}: socket driver finished");
    let _ = events.send(LinkEvent::Closed {
        reason: close_reason,
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn request(url: &str, token: Option<&str>) -> ConnectRequest {
        ConnectRequest {
            url: url.to_string(),
            bearer_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_build_request_sets_bearer_header() {
        let handshake = build_request(&request("ws://127.0.0.1:9/rpc", Some("abc"))).unwrap();

        let header = handshake.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer abc");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_build_request_without_token_has_no_auth_header() {
        let handshake = build_request(&request("ws://127.0.0.1:9/rpc", None)).unwrap();
        assert!(handshake.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let result = build_request(&request("ws://127.0.0.1:9/", Some("bad\ntoken")));
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[test]
    fn test_non_websocket_url_is_rejected() {
        let result = build_request(&request("not a url", None));
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_connect_error() {
        // Arrange: grab a free port, then release it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let connector = TungsteniteConnector::new(Duration::from_secs(5));

        // Act
        let result = connector
            .connect(&request(&format!("ws://{addr}/"), None))
            .await;

        // Assert
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_silent_server_hits_connect_timeout() {
        // Arrange: the listener accepts TCP but never answers the handshake
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connector = TungsteniteConnector::new(Duration::from_millis(200));

        // Act
        let result = connector
            .connect(&request(&format!("ws://{addr}/"), None))
            .await;

        // Assert
        assert_eq!(
            result.err(),
            Some(TransportError::Timeout(Duration::from_millis(200)))
        );
        drop(listener);
    }
}
