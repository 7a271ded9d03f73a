//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for SIGINT / SIGTERM (ctrl-c elsewhere)
//! - Trigger shutdown on the first signal
//! - Force exit on the second
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The listener only cancels the token; teardown happens in the engine

use crate::lifecycle::Shutdown;

/// Exit code used when a second signal interrupts a graceful shutdown.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task that triggers `shutdown` on the first termination signal and
/// exits the process on the second.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            tracing::error!(error = %e, "Failed to install signal handler");
            return;
        }
        shutdown.trigger();

        if wait_for_signal().await.is_ok() {
            std::process::exit(FORCED_EXIT_CODE);
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
