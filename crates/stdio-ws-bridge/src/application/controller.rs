//! Connection controller: the WebSocket lifecycle state machine.
//!
//! The controller is a single-owner actor.  One task runs
//! [`ConnectionController::run`] and owns all of the mutable lifecycle data:
//! the connection state, the reconnect attempt counter, the outbound queue,
//! the retry timer and the heartbeat timer.  Everything else (stdin reader,
//! signal handler, connect attempts, the socket driver) talks to it through
//! channels, so every mutation happens in one place, one event at a time.
//!
//! # Transitions
//!
//! | From           | Event                  | To             | Side effects                                   |
//! |----------------|------------------------|----------------|------------------------------------------------|
//! | `Disconnected` | start / retry fires    | `Connecting`   | spawn connect attempt (bearer header if set)   |
//! | `Connecting`   | attempt succeeds       | `Connected`    | reset counter, arm heartbeat, drain queue      |
//! | `Connecting`   | attempt fails          | `Disconnected` | schedule retry                                 |
//! | `Connected`    | link closed            | `Disconnected` | stop heartbeat, schedule retry                 |
//! | any            | shutdown               | terminal       | cancel retry, stop heartbeat, close link       |
//!
//! End of local input arrives as [`Command::InputClosed`], behind every
//! frame read before it.  The controller stops as soon as nothing is left
//! in the queue; until then it keeps connecting so the backlog still goes
//! out.  An explicit shutdown does not wait.
//!
//! A link error event is logged and published but changes nothing; the
//! close event that follows it drives the transition.
//!
//! # Event loop
//!
//! `run` is a `biased` `select!`.  The shutdown signal is polled first, so
//! once shutdown is requested no retry or heartbeat branch runs again.

use std::sync::Arc;

use bridge_core::{
    decode_frame, encode_frame, ConnectionState, DeliverySink, OutboundQueue, StructuredMessage,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::bridge_service::BridgeError;
use crate::application::heartbeat::HeartbeatMonitor;
use crate::application::reconnect::ReconnectScheduler;
use crate::application::transport::{
    ConnectRequest, Connector, LinkEvent, TransportError, WsLink,
};
use crate::domain::{BridgeConfig, BridgeEvent};

/// A warning is logged each time the backlog grows by this many messages.
const QUEUE_WARN_STEP: usize = 1000;

type ConnectAttempt = JoinHandle<Result<WsLink, TransportError>>;

/// Requests from the local side.
#[derive(Debug)]
pub enum Command {
    /// Relay one decoded local frame to the remote side.
    Relay(StructuredMessage),
    /// The local input reached end of file.
    InputClosed,
    /// The local input stream broke; the bridge cannot continue.
    InputFailed(String),
}

/// Idempotent shutdown trigger shared by the facade, the input pump and the
/// signal handler.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Requests shutdown.  Returns `true` for the first call only; later
    /// calls are no-ops.
    pub fn shutdown(&self) -> bool {
        self.signal.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    /// `true` once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.signal.borrow()
    }
}

/// Everything needed to talk to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    /// Local frames and local failures go here.
    pub commands: mpsc::UnboundedSender<Command>,
    /// Stops the controller.
    pub shutdown: ShutdownHandle,
}

/// The state machine.  `W` is the local output (stdout in production).
pub struct ConnectionController<W> {
    config: Arc<BridgeConfig>,
    connector: Arc<dyn Connector>,
    output: W,
    events: broadcast::Sender<BridgeEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
    queue: OutboundQueue<StructuredMessage>,
    reconnect: ReconnectScheduler,
    heartbeat: HeartbeatMonitor,
    link: Option<WsLink>,
    connecting: Option<ConnectAttempt>,
    input_closed: bool,
    shutting_down: bool,
}

impl<W> ConnectionController<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Builds a controller in `Disconnected` with an empty queue.
    pub fn new(
        config: Arc<BridgeConfig>,
        connector: Arc<dyn Connector>,
        output: W,
        events: broadcast::Sender<BridgeEvent>,
    ) -> (Self, ControllerHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let controller = Self {
            reconnect: ReconnectScheduler::new(config.backoff()),
            heartbeat: HeartbeatMonitor::new(config.heartbeat_interval),
            config,
            connector,
            output,
            events,
            commands: commands_rx,
            shutdown: shutdown_rx,
            state: ConnectionState::Disconnected,
            queue: OutboundQueue::new(),
            link: None,
            connecting: None,
            input_closed: false,
            shutting_down: false,
        };
        let handle = ControllerHandle {
            commands: commands_tx,
            shutdown: ShutdownHandle {
                signal: Arc::new(shutdown_tx),
            },
        };
        (controller, handle)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Messages waiting for the WebSocket.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Runs the actor until shutdown, then tears everything down.
    ///
    /// Every handle dropping also counts as shutdown, as does end of input
    /// once the queue is empty.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LocalIo`] when writing to the local output fails and
    /// [`BridgeError::InputFailed`] when the local input breaks.  Remote
    /// failures never end the loop.
    pub async fn run(mut self) -> Result<(), BridgeError> {
        if !*self.shutdown.borrow() {
            self.begin_connect();
        }

        let result = loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => break Ok(()),

                event = next_link_event(&mut self.link) => {
                    if let Err(e) = self.on_link_event(event).await {
                        break Err(e);
                    }
                }

                outcome = connect_outcome(&mut self.connecting) => {
                    self.on_connect_outcome(outcome);
                    if self.input_done() {
                        break Ok(());
                    }
                }

                command = self.commands.recv() => match command {
                    Some(Command::Relay(message)) => self.send_to_remote(message),
                    Some(Command::InputClosed) => {
                        self.input_closed = true;
                        if self.input_done() {
                            break Ok(());
                        }
                        info!(
                            "local input closed; waiting to deliver {} queued message(s)",
                            self.queue.len()
                        );
                    }
                    Some(Command::InputFailed(reason)) => break Err(BridgeError::InputFailed(reason)),
                    None => break Ok(()),
                },

                () = self.reconnect.fired() => self.begin_connect(),

                () = self.heartbeat.tick() => self.probe(),
            }
        };

        self.teardown().await;
        result
    }

    // ── Transitions ───────────────────────────────────────────────────────────

    /// `Disconnected → Connecting`: spawns one connection attempt.
    fn begin_connect(&mut self) {
        if self.shutting_down || self.state != ConnectionState::Disconnected {
            return;
        }
        // An explicit start supersedes any retry that was still pending.
        self.reconnect.cancel();
        self.state = ConnectionState::Connecting;

        let request = ConnectRequest {
            url: self.config.url.to_string(),
            bearer_token: self.config.token.clone(),
        };
        info!(
            "connecting to {} (attempt {})",
            request.url,
            self.reconnect.attempts()
        );

        let connector = Arc::clone(&self.connector);
        self.connecting = Some(tokio::spawn(async move {
            connector.connect(&request).await
        }));
    }

    fn on_connect_outcome(&mut self, outcome: Result<WsLink, TransportError>) {
        match outcome {
            Ok(link) => self.on_open(link),
            Err(e) => {
                warn!("connection to {} failed: {e}", self.config.url);
                self.notify(BridgeEvent::Error {
                    details: e.to_string(),
                });
                self.state = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
        }
    }

    /// `Connecting → Connected`.
    fn on_open(&mut self, link: WsLink) {
        info!("link {}: connected to {}", link.id(), self.config.url);
        self.state = ConnectionState::Connected;
        self.reconnect.reset();
        self.link = Some(link);
        if self.heartbeat.start() {
            debug!("heartbeat armed every {:?}", self.config.heartbeat_interval);
        }
        self.notify(BridgeEvent::Connected {
            url: self.config.url.to_string(),
        });
        self.drain_queue();
    }

    /// `Connected → Disconnected`.
    fn on_link_closed(&mut self, reason: Option<String>) {
        let id = self.link.take().map(|link| link.id());
        self.heartbeat.stop();
        self.state = ConnectionState::Disconnected;
        match (id, reason) {
            (Some(id), Some(reason)) => info!("link {id}: closed ({reason})"),
            (Some(id), None) => info!("link {id}: closed"),
            (None, _) => info!("link closed"),
        }
        self.notify(BridgeEvent::Disconnected);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.shutting_down {
            return;
        }
        let attempt = self.reconnect.attempts();
        let delay = self.reconnect.schedule_next();
        info!("reconnecting in {delay:?} (retry {attempt})");
    }

    // ── Event handlers ────────────────────────────────────────────────────────

    async fn on_link_event(&mut self, event: LinkEvent) -> Result<(), BridgeError> {
        match event {
            LinkEvent::Message(text) => self.relay_to_local(&text).await?,
            LinkEvent::Pong => {
                self.heartbeat.record_pong();
                debug!("pong received");
            }
            LinkEvent::Error(details) => {
                warn!("websocket error: {details}");
                self.notify(BridgeEvent::Error { details });
            }
            LinkEvent::Closed { reason } => self.on_link_closed(reason),
        }
        Ok(())
    }

    /// Remote → local.  No queueing: the local output is assumed writable,
    /// and a failed write is fatal.
    async fn relay_to_local(&mut self, text: &str) -> Result<(), BridgeError> {
        let message = match decode_frame(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("discarding malformed frame from remote: {e}");
                return Ok(());
            }
        };
        let mut line = encode_frame(&message);
        line.push('\n');
        self.output.write_all(line.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    /// Local → remote: immediate delivery when connected and writable,
    /// otherwise the message joins the queue.
    fn send_to_remote(&mut self, message: StructuredMessage) {
        let mut message = message;
        if self.state.is_connected() && self.queue.is_empty() {
            if let Some(link) = self.link.as_mut() {
                match link.try_send(message) {
                    Ok(()) => return,
                    Err(refused) => message = refused,
                }
            }
        }
        self.enqueue(message);
    }

    fn enqueue(&mut self, message: StructuredMessage) {
        self.queue.enqueue(message);
        let queued = self.queue.len();
        if queued % QUEUE_WARN_STEP == 0 {
            warn!("{queued} messages queued while {}", self.state);
        } else {
            debug!("queued message ({queued} waiting, {})", self.state);
        }
    }

    fn drain_queue(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if self.queue.is_empty() {
            return;
        }
        let delivered = self.queue.drain_into(link);
        info!(
            "link {}: flushed {delivered} queued message(s), {} remaining",
            link.id(),
            self.queue.len()
        );
    }

    fn probe(&mut self) {
        let Some(link) = self.link.as_ref() else {
            self.heartbeat.stop();
            return;
        };
        if self.heartbeat.record_probe() {
            match self.heartbeat.last_pong() {
                Some(at) => debug!(
                    "link {}: previous ping got no pong (last pong {:?} ago, {} pings sent)",
                    link.id(),
                    at.elapsed(),
                    self.heartbeat.probes_sent()
                ),
                None => debug!(
                    "link {}: previous ping got no pong (none yet, {} pings sent)",
                    link.id(),
                    self.heartbeat.probes_sent()
                ),
            }
        }
        match link.ping() {
            Ok(()) => debug!("link {}: heartbeat ping sent", link.id()),
            Err(e) => debug!("link {}: heartbeat ping failed: {e}", link.id()),
        }
    }

    /// Local input has ended and everything it produced was handed to a link.
    fn input_done(&self) -> bool {
        self.input_closed && self.queue.is_empty()
    }

    fn notify(&self, event: BridgeEvent) {
        // No subscribers is fine; notifications are best-effort.
        let _ = self.events.send(event);
    }

    /// Cancels both timers before anything else, then closes the link.
    async fn teardown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        self.reconnect.cancel();
        self.heartbeat.stop();
        if let Some(attempt) = self.connecting.take() {
            attempt.abort();
        }

        let was_connected = self.state.is_connected();
        self.state = ConnectionState::Disconnected;
        if let Some(link) = self.link.take() {
            info!("link {}: closing", link.id());
            link.close().await;
        }
        if was_connected {
            self.notify(BridgeEvent::Disconnected);
        }
        if !self.queue.is_empty() {
            warn!(
                "shutting down with {} undelivered message(s)",
                self.queue.len()
            );
        }
        if let Err(e) = self.output.flush().await {
            debug!("final flush of local output failed: {e}");
        }
        info!("connection controller stopped");
    }
}

/// Next event from the live link; pends while there is none.
async fn next_link_event(link: &mut Option<WsLink>) -> LinkEvent {
    match link.as_mut() {
        Some(link) => link.next_event().await,
        None => std::future::pending().await,
    }
}

/// Result of the in-flight connect attempt; pends while there is none.
async fn connect_outcome(pending: &mut Option<ConnectAttempt>) -> Result<WsLink, TransportError> {
    let Some(attempt) = pending.as_mut() else {
        return std::future::pending().await;
    };
    let joined = attempt.await;
    *pending = None;
    match joined {
        Ok(outcome) => outcome,
        Err(e) => Err(TransportError::Connect(format!("connect task failed: {e}"))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
