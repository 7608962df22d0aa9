//! Application layer for stdio-ws-bridge.
//!
//! The application layer owns the connection lifecycle: *when* to dial,
//! *when* to retry, *what* to do with a frame.  It never opens a socket
//! itself; it talks to the WebSocket through the [`transport::Connector`]
//! port, which the infrastructure layer implements.
//!
//! # Responsibilities
//!
//! - The connection state machine and its event loop (`controller`)
//! - Retry timing (`reconnect`) and liveness pings (`heartbeat`)
//! - Reading local input and starting/stopping the bridge (`bridge_service`)
//!
//! # What does NOT belong here?
//!
//! - TCP, TLS and WebSocket framing (tokio-tungstenite, infrastructure)
//! - Signal handling and stdio handles (infrastructure)
//! - Configuration parsing (that is done in `main.rs`)

pub mod bridge_service;
pub mod controller;
pub mod heartbeat;
pub mod reconnect;
pub mod transport;

pub use bridge_service::{pump_local_input, BridgeError, BridgeService, InputSummary, RunningBridge};
pub use controller::{Command, ConnectionController, ControllerHandle, ShutdownHandle};
pub use transport::{ConnectRequest, Connector, TransportError, WsLink};
