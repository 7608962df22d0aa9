//! stdio-ws-bridge: entry point.
//!
//! This binary lets a process that speaks JSON-RPC over stdin/stdout (one
//! frame per line) talk to a JSON-RPC server that is only reachable over a
//! WebSocket.  Frames are relayed unchanged in both directions; the
//! WebSocket is re-dialled with exponential backoff whenever it drops, and
//! anything written locally while it is down is queued and delivered in
//! order once it is back.
//!
//! # Usage
//!
//! ```text
//! stdio-ws-bridge --url <URL> [OPTIONS]
//!
//! Options:
//!   --url <URL>                      ws:// or wss:// endpoint (required)
//!   --token <TOKEN>                  Bearer token sent on every connection attempt
//!   --reconnect-interval <MS>        First retry delay [default: 1000]
//!   --max-reconnect-interval <MS>    Retry delay ceiling [default: 30000]
//!   --reconnect-decay <FACTOR>       Retry delay growth factor [default: 1.5]
//!   --heartbeat-interval <MS>        Ping interval, 0 disables [default: 30000]
//!   --connect-timeout <MS>           Handshake deadline [default: 10000]
//!   --debug                          Debug logging when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                        | Default  | Description                 |
//! |---------------------------------|----------|-----------------------------|
//! | `BRIDGE_WS_URL`                 | none     | WebSocket endpoint          |
//! | `BRIDGE_AUTH_TOKEN`             | none     | Bearer token                |
//! | `BRIDGE_RECONNECT_INTERVAL`     | `1000`   | First retry delay (ms)      |
//! | `BRIDGE_MAX_RECONNECT_INTERVAL` | `30000`  | Retry delay ceiling (ms)    |
//! | `BRIDGE_RECONNECT_DECAY`        | `1.5`    | Retry delay growth factor   |
//! | `BRIDGE_HEARTBEAT_INTERVAL`     | `30000`  | Ping interval (ms)          |
//! | `BRIDGE_CONNECT_TIMEOUT`        | `10000`  | Handshake deadline (ms)     |
//! | `BRIDGE_DEBUG`                  | `false`  | Debug logging               |
//!
//! # Streams
//!
//! stdout carries frames only.  Logs go to stderr, filtered by `RUST_LOG`
//! when set, otherwise `debug` with `--debug` and `warn` without.
//!
//! # Exit status
//!
//! `0` after end of input or SIGINT/SIGTERM, `1` on invalid configuration
//! or a local I/O failure.  Remote failures never end the process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use stdio_ws_bridge::application::BridgeService;
use stdio_ws_bridge::domain::{BridgeConfig, BridgeEvent};
use stdio_ws_bridge::infrastructure::{spawn_signal_listener, stdio, TungsteniteConnector};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Relay line-delimited JSON-RPC on stdio to a reconnecting WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "stdio-ws-bridge",
    about = "Bidirectional JSON-RPC relay between stdio and a reconnecting WebSocket",
    version
)]
struct Cli {
    /// WebSocket endpoint (`ws://` or `wss://`).
    #[arg(long, env = "BRIDGE_WS_URL")]
    url: String,

    /// Bearer token, sent as `Authorization: Bearer <token>` on every
    /// connection attempt including reconnects.
    #[arg(long, env = "BRIDGE_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Delay before the first reconnect attempt, in milliseconds.
    #[arg(long, default_value_t = 1000, env = "BRIDGE_RECONNECT_INTERVAL")]
    reconnect_interval: u64,

    /// Upper bound for any reconnect delay, in milliseconds.
    #[arg(long, default_value_t = 30_000, env = "BRIDGE_MAX_RECONNECT_INTERVAL")]
    max_reconnect_interval: u64,

    /// Factor the reconnect delay grows by after each failed attempt.
    #[arg(long, default_value_t = 1.5, env = "BRIDGE_RECONNECT_DECAY")]
    reconnect_decay: f64,

    /// Interval between WebSocket pings while connected, in milliseconds.
    /// `0` disables the heartbeat.
    #[arg(long, default_value_t = 30_000, env = "BRIDGE_HEARTBEAT_INTERVAL")]
    heartbeat_interval: u64,

    /// Deadline for one WebSocket handshake, in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "BRIDGE_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// Log at debug level when `RUST_LOG` is not set.
    #[arg(long, env = "BRIDGE_DEBUG")]
    debug: bool,
}

impl Cli {
    /// Converts the parsed CLI arguments into a validated [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--url` does not parse or any value fails
    /// [`BridgeConfig::validate`].
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let url: Url = self
            .url
            .parse()
            .with_context(|| format!("invalid WebSocket URL: '{}'", self.url))?;

        let mut config = BridgeConfig::new(url);
        config.token = self.token;
        config.reconnect_interval = Duration::from_millis(self.reconnect_interval);
        config.max_reconnect_interval = Duration::from_millis(self.max_reconnect_interval);
        config.reconnect_decay = self.reconnect_decay;
        config.heartbeat_interval = Duration::from_millis(self.heartbeat_interval);
        config.connect_timeout = Duration::from_millis(self.connect_timeout);
        config.debug = self.debug;

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Level used when `RUST_LOG` is absent or invalid.
fn default_log_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// Exits through `std::process::exit` so a stdin read parked on tokio's
/// blocking pool cannot keep the process alive after shutdown.
#[tokio::main]
async fn main() {
    let config = Cli::parse().into_bridge_config();

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // stdout is the frame channel, so every log line goes to stderr.
    let debug = config.as_ref().is_ok_and(|config| config.debug);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_level(debug))),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    info!(
        "stdio-ws-bridge starting: url={}, auth={}, heartbeat={:?}",
        config.url,
        if config.token.is_some() { "bearer" } else { "none" },
        config.heartbeat_interval
    );

    let connector = Arc::new(TungsteniteConnector::from_config(&config));
    let service = BridgeService::new(config, connector);
    tokio::spawn(log_events(service.subscribe()));

    let bridge = service.start(stdio::local_input(), stdio::local_output());
    spawn_signal_listener(bridge.shutdown_handle());

    bridge.wait().await.context("bridge stopped")?;

    info!("stdio-ws-bridge stopped");
    Ok(())
}

/// Logs lifecycle notifications until the bridge goes away.
async fn log_events(mut events: broadcast::Receiver<BridgeEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!("bridge event: {event}"),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!("missed {missed} bridge event(s)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
