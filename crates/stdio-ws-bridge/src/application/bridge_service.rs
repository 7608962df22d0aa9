//! Bridge facade: wires the local streams to the connection controller.
//!
//! [`BridgeService`] is what the binary (and the integration tests) use.
//! `start` spawns two tasks:
//!
//! ```text
//! local input ──▶ input pump ── Command::Relay ──▶ ConnectionController ──▶ WebSocket
//! local output ◀──────────────────────────────── ConnectionController ◀── WebSocket
//! ```
//!
//! The input pump splits the local stream into lines, decodes each one and
//! hands the result to the controller.  End of input is sent down the same
//! channel, after the last frame, and ends the bridge once those frames are
//! out; a read error is reported to the controller as fatal.

use std::io;
use std::sync::Arc;

use bridge_core::decode_frame;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::controller::{Command, ConnectionController, ShutdownHandle};
use crate::application::transport::Connector;
use crate::domain::{BridgeConfig, BridgeEvent};

/// Capacity of the notification channel.  Lagging subscribers lose the
/// oldest notifications, never frames.
const EVENT_CAPACITY: usize = 64;

// ── Error type ────────────────────────────────────────────────────────────────

/// Failures that end the bridge.
///
/// Remote trouble (refused connections, dropped sockets, bad frames) is
/// never in this list: it is logged and retried.  Only the local side can
/// make the bridge give up.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Writing a frame to the local output failed.
    #[error("local output failed: {0}")]
    LocalIo(#[from] io::Error),

    /// Reading the local input failed.
    #[error("local input failed: {0}")]
    InputFailed(String),

    /// A bridge task panicked or was cancelled.
    #[error("bridge task failed: {0}")]
    TaskFailed(String),
}

// ── Facade ────────────────────────────────────────────────────────────────────

/// Builds and starts bridges for one configuration.
pub struct BridgeService {
    config: Arc<BridgeConfig>,
    connector: Arc<dyn Connector>,
    events: broadcast::Sender<BridgeEvent>,
}

impl BridgeService {
    /// Creates a service that dials through `connector`.
    pub fn new(config: BridgeConfig, connector: Arc<dyn Connector>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config: Arc::new(config),
            connector,
            events,
        }
    }

    /// Subscribes to lifecycle notifications.  Subscribe before `start` to
    /// see the first `Connected`.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Starts relaying between `input`/`output` and the WebSocket.  The
    /// first connection attempt begins immediately.
    pub fn start<R, W>(&self, input: R, output: W) -> RunningBridge
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (controller, handle) = ConnectionController::new(
            Arc::clone(&self.config),
            Arc::clone(&self.connector),
            output,
            self.events.clone(),
        );
        let controller = tokio::spawn(controller.run());

        let commands = handle.commands;
        let shutdown = handle.shutdown;
        let input = tokio::spawn(async move {
            // The controller may already be gone; nothing left to tell.
            match pump_local_input(input, &commands).await {
                Ok(summary) => {
                    info!(
                        "local input closed ({} relayed, {} discarded)",
                        summary.relayed, summary.discarded
                    );
                    let _ = commands.send(Command::InputClosed);
                }
                Err(e) => {
                    let _ = commands.send(Command::InputFailed(e.to_string()));
                }
            }
        });

        RunningBridge {
            shutdown,
            controller,
            input,
        }
    }
}

/// A started bridge.
pub struct RunningBridge {
    shutdown: ShutdownHandle,
    controller: JoinHandle<Result<(), BridgeError>>,
    input: JoinHandle<()>,
}

impl RunningBridge {
    /// A handle that can stop the bridge from elsewhere (signal handlers).
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Requests shutdown.  Idempotent: only the first call returns `true`.
    pub fn shutdown(&self) -> bool {
        self.shutdown.shutdown()
    }

    /// Waits for the controller to finish, then stops the input pump.
    ///
    /// # Errors
    ///
    /// Whatever ended the controller, or [`BridgeError::TaskFailed`] if it
    /// panicked.
    pub async fn wait(self) -> Result<(), BridgeError> {
        let outcome = self.controller.await;
        self.input.abort();
        match outcome {
            Ok(result) => result,
            Err(e) => Err(BridgeError::TaskFailed(e.to_string())),
        }
    }
}

// ── Local input ───────────────────────────────────────────────────────────────

/// Counters reported when the local input ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputSummary {
    /// Lines decoded and handed to the controller.
    pub relayed: u64,
    /// Lines that were not valid JSON.
    pub discarded: u64,
}

/// Reads newline-delimited frames from `reader` until end of input.
///
/// Blank lines are skipped.  A line that does not decode is logged and
/// dropped; the lines around it still go through.  Bytes that are not
/// UTF-8 are treated like any other malformed line.
///
/// # Errors
///
/// Any I/O error from `reader`.
pub async fn pump_local_input<R>(
    mut reader: R,
    commands: &mpsc::UnboundedSender<Command>,
) -> io::Result<InputSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = InputSummary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        match decode_frame(line) {
            Ok(message) => {
                if commands.send(Command::Relay(message)).is_err() {
                    debug!("controller stopped; no longer reading local input");
                    break;
                }
                summary.relayed += 1;
            }
            Err(e) => {
                warn!("discarding malformed local line: {e}");
                summary.discarded += 1;
            }
        }
    }

    Ok(summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, BufReader};

    use crate::application::transport::{
        link_pair, ConnectRequest, LinkEvent, LinkPeer, OutboundFrame, TransportError, WsLink,
    };

    /// Hands out a single link, then refuses.
    struct OneLinkConnector {
        link: Mutex<Option<WsLink>>,
    }

    impl OneLinkConnector {
        fn new() -> (Arc<Self>, LinkPeer) {
            let (link, peer) = link_pair();
            let connector = Arc::new(Self {
                link: Mutex::new(Some(link)),
            });
            (connector, peer)
        }
    }

    #[async_trait]
    impl Connector for OneLinkConnector {
        async fn connect(&self, _request: &ConnectRequest) -> Result<WsLink, TransportError> {
            self.link
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| TransportError::Connect("refused".to_string()))
        }
    }

    fn config() -> BridgeConfig {
        BridgeConfig::new("ws://127.0.0.1:9/".parse().unwrap())
    }

    // ── pump_local_input ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_malformed_line_is_dropped_between_valid_lines() {
        // Arrange
        let input: &[u8] = b"{\"id\":1}\n{not json\n{\"id\":2}\n";
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Act
        let summary = pump_local_input(input, &tx).await.unwrap();

        // Assert
        assert_eq!(
            summary,
            InputSummary {
                relayed: 2,
                discarded: 1
            }
        );
        let mut relayed = Vec::new();
        while let Ok(Command::Relay(message)) = rx.try_recv() {
            relayed.push(message);
        }
        assert_eq!(relayed, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped_silently() {
        let input: &[u8] = b"\n   \r\n{\"id\":1}\r\n\n";
        let (tx, _rx) = mpsc::unbounded_channel();

        let summary = pump_local_input(input, &tx).await.unwrap();

        assert_eq!(summary.relayed, 1);
        assert_eq!(summary.discarded, 0);
    }

    #[tokio::test]
    async fn test_final_line_without_newline_is_relayed() {
        let input: &[u8] = b"{\"id\":1}\n{\"id\":2}";
        let (tx, _rx) = mpsc::unbounded_channel();

        let summary = pump_local_input(input, &tx).await.unwrap();

        assert_eq!(summary.relayed, 2);
    }

    #[tokio::test]
    async fn test_non_utf8_line_counts_as_malformed() {
        let input: &[u8] = b"\xff\xfe\n{\"id\":1}\n";
        let (tx, _rx) = mpsc::unbounded_channel();

        let summary = pump_local_input(input, &tx).await.unwrap();

        assert_eq!(
            summary,
            InputSummary {
                relayed: 1,
                discarded: 1
            }
        );
    }

    // ── BridgeService ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_relays_in_both_directions() {
        // Arrange
        let (connector, mut peer) = OneLinkConnector::new();
        let service = BridgeService::new(config(), connector);
        let mut events = service.subscribe();
        let (mut local_in, input) = tokio::io::duplex(4096);
        let (output, local_out) = tokio::io::duplex(4096);
        let bridge = service.start(BufReader::new(input), output);
        assert!(matches!(events.recv().await, Ok(BridgeEvent::Connected { .. })));

        // Act: local → remote
        local_in
            .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"id\":1}\n")
            .await
            .unwrap();
        let frame = peer.frames.recv().await.unwrap();

        // Act: remote → local
        peer.events
            .send(LinkEvent::Message(r#"{"jsonrpc":"2.0","result":{},"id":1}"#.to_string()))
            .unwrap();
        let mut lines = BufReader::new(local_out).lines();
        let line = lines.next_line().await.unwrap().unwrap();

        // Assert
        assert_eq!(
            frame,
            OutboundFrame::Text(r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#.to_string())
        );
        assert_eq!(line, r#"{"jsonrpc":"2.0","result":{},"id":1}"#);

        assert!(bridge.shutdown());
        bridge.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_end_of_input_shuts_down_cleanly() {
        let (connector, mut peer) = OneLinkConnector::new();
        let service = BridgeService::new(config(), connector);
        let input: &'static [u8] = b"{\"id\":1}\n";

        let bridge = service.start(input, tokio::io::sink());

        bridge.wait().await.unwrap();
        assert_eq!(
            peer.frames.try_recv().unwrap(),
            OutboundFrame::Text(r#"{"id":1}"#.to_string())
        );
        assert_eq!(peer.frames.try_recv().unwrap(), OutboundFrame::Close);
    }

    #[tokio::test]
    async fn test_lines_written_just_before_end_of_input_are_delivered() {
        // Arrange: connected
        let (connector, mut peer) = OneLinkConnector::new();
        let service = BridgeService::new(config(), connector);
        let mut events = service.subscribe();
        let (mut local_in, input) = tokio::io::duplex(4096);
        let bridge = service.start(BufReader::new(input), tokio::io::sink());
        assert!(matches!(events.recv().await, Ok(BridgeEvent::Connected { .. })));

        // Act: two lines, then end of input
        local_in.write_all(b"{\"id\":1}\n{\"id\":2}\n").await.unwrap();
        drop(local_in);
        bridge.wait().await.unwrap();

        // Assert: both frames went out, in order, before the close
        let mut frames = Vec::new();
        while let Ok(frame) = peer.frames.try_recv() {
            frames.push(frame);
        }
        assert_eq!(
            frames,
            vec![
                OutboundFrame::Text(r#"{"id":1}"#.to_string()),
                OutboundFrame::Text(r#"{"id":2}"#.to_string()),
                OutboundFrame::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (connector, _peer) = OneLinkConnector::new();
        let service = BridgeService::new(config(), connector);
        let (_local_in, input) = tokio::io::duplex(64);
        let bridge = service.start(BufReader::new(input), tokio::io::sink());

        let handle = bridge.shutdown_handle();
        assert!(handle.shutdown());
        assert!(!bridge.shutdown());
        assert!(handle.is_requested());

        bridge.wait().await.unwrap();
    }
}
