//! stdio-ws-bridge library crate.
//!
//! This crate relays JSON-RPC frames between a line-delimited local stream
//! (stdin/stdout) and a remote WebSocket endpoint, reconnecting with
//! exponential backoff whenever the WebSocket drops.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Local process (one JSON frame per line on stdin/stdout)
//!         ↕
//! [stdio-ws-bridge]
//!   ├── domain/             Pure types: BridgeConfig, BridgeEvent
//!   ├── application/        Connection state machine, retry and heartbeat
//!   │                       timers, outbound queue, local input pump
//!   └── infrastructure/
//!         ├── ws_client/    WebSocket dialling and socket driver (tokio-tungstenite)
//!         ├── stdio/        stdin/stdout handles
//!         └── signals/      SIGINT/SIGTERM → shutdown
//!         ↕
//! Remote JSON-RPC server (ws:// or wss://)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `bridge-core`, and reaches the
//!   network only through the `Connector` trait.
//! - `infrastructure` depends on all other layers plus `tokio-tungstenite`.
//!
//! Because the application layer only sees the `Connector` port, the whole
//! lifecycle (backoff, queueing, heartbeat, shutdown) is tested with
//! in-memory links and a paused clock.

/// Domain layer: configuration and lifecycle notifications (no I/O).
pub mod domain;

/// Application layer: connection lifecycle and relay logic.
pub mod application;

/// Infrastructure layer: WebSocket client, stdio and signals.
pub mod infrastructure;
