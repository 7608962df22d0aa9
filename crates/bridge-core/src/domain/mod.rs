//! Domain layer: connection-lifecycle data with no I/O and no timers.
//!
//! - [`queue`] – FIFO buffer of messages waiting for the WebSocket.
//! - [`backoff`] – delay curve between reconnect attempts.
//! - [`state`] – the `Disconnected / Connecting / Connected` enum.
//!
//! The timer-owning halves (the scheduler that actually sleeps, the
//! heartbeat interval) live in the bridge crate, which owns the runtime.

pub mod backoff;
pub mod queue;
pub mod state;

pub use backoff::BackoffPolicy;
pub use queue::{DeliverySink, OutboundQueue};
pub use state::ConnectionState;
