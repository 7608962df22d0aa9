//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and, on Unix, SIGTERM both route to the bridge's
//! idempotent shutdown.  A second signal is harmless.

use std::io;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::ShutdownHandle;

/// Resolves with the signal name once SIGINT or SIGTERM arrives.
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown_signal() -> io::Result<&'static str> {
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        result = terminate() => result.map(|()| "SIGTERM"),
    }
}

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> io::Result<()> {
    std::future::pending().await
}

/// Spawns a task that requests shutdown on the first signal.
pub fn spawn_signal_listener(shutdown: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(name) => {
                info!("received {name}; shutting down");
                shutdown.shutdown();
            }
            Err(e) => error!("failed to listen for shutdown signals: {e}"),
        }
    })
}
