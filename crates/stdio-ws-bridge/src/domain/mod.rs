//! Domain layer for stdio-ws-bridge.
//!
//! Pure types with no I/O: the runtime configuration and the lifecycle
//! notifications the bridge publishes.  Nothing here touches `tokio`,
//! sockets or the environment.

pub mod config;
pub mod events;

// Short paths: `domain::BridgeConfig` rather than `domain::config::BridgeConfig`.
pub use config::{BridgeConfig, ConfigError};
pub use events::BridgeEvent;
