//! Infrastructure layer for stdio-ws-bridge.
//!
//! The infrastructure layer handles all I/O: dialling the WebSocket, the
//! process's stdio handles, and OS signals.
//!
//! # Responsibilities
//!
//! - Performing the WebSocket handshake (with the bearer header) and pumping
//!   the socket in a per-connection driver task
//! - Handing out stdin/stdout for the relay
//! - Routing SIGINT/SIGTERM to shutdown
//!
//! # What does NOT belong here?
//!
//! - Retry timing, heartbeat timing, queueing (that is the application layer)
//! - Configuration types (that is the domain layer)

pub mod signals;
pub mod stdio;
pub mod ws_client;

pub use signals::spawn_signal_listener;
pub use ws_client::TungsteniteConnector;
