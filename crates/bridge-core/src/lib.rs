//! # bridge-core
//!
//! Shared library for the stdio/WebSocket JSON-RPC bridge containing the
//! frame codec, the outbound message queue, the reconnect backoff policy and
//! the connection state type.
//!
//! This crate has zero dependencies on async runtimes, sockets, or timers.
//! Everything here is plain data and pure functions, so the connection
//! lifecycle engine in `stdio-ws-bridge` can be tested against it without a
//! network.
//!
//! # Architecture overview
//!
//! The bridge relays JSON-RPC messages between a line-delimited local stream
//! (stdin/stdout) and a WebSocket.  This crate defines the pieces both sides
//! share:
//!
//! - **`protocol`** – How one line of text becomes a structured message and
//!   back again.  The bridge never looks inside the message; it only needs it
//!   to be a well-formed JSON document.
//!
//! - **`domain`** – The outbound queue that buffers messages while the
//!   WebSocket is down, the exponential backoff curve used between reconnect
//!   attempts, and the `Disconnected → Connecting → Connected` state enum.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `bridge_core::OutboundQueue` instead of `bridge_core::domain::queue::OutboundQueue`.
pub use domain::backoff::BackoffPolicy;
pub use domain::queue::{DeliverySink, OutboundQueue};
pub use domain::state::ConnectionState;
pub use protocol::codec::{decode_frame, encode_frame, CodecError, StructuredMessage};
