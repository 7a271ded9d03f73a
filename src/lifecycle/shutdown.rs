//! Shutdown coordination for the tunnel client.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Coordinator for graceful shutdown.
///
/// Wraps a cancellation token: triggering is one-way, idempotent, and wakes
/// every clone currently awaiting [`Shutdown::cancelled`]. Waits that start
/// after the trigger complete immediately.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Trigger the shutdown signal. Further calls have no effect.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns true once shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when shutdown is triggered.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
