//! Single-writer task for the relay connection.
//!
//! Every outbound frame (credentials, responses, pings, pongs) is queued on
//! the [`Outbox`] and written by one task, so frames never interleave.

use std::time::Duration;

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::{TunnelError, TunnelResult};
use crate::net::{ConnectionId, WsSink};
use crate::protocol::{codec, Envelope};

/// Queue feeding the writer task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<Envelope>,
}

impl Outbox {
    /// Queue a frame, waiting for space. Fails once the writer has stopped.
    pub async fn send(&self, envelope: Envelope) -> TunnelResult<()> {
        self.tx.send(envelope).await.map_err(|_| TunnelError::Closed)
    }

    #[cfg(test)]
    pub(crate) fn from_sender(tx: mpsc::Sender<Envelope>) -> Self {
        Self { tx }
    }
}

/// Owner of the write half of one relay connection.
pub struct Writer {
    outbox: Outbox,
    handle: JoinHandle<TunnelResult<()>>,
    failed: CancellationToken,
}

impl Writer {
    /// Spawn the writer task over `sink` with a queue of `capacity` frames.
    pub fn spawn(sink: WsSink, capacity: usize, connection_id: ConnectionId) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let failed = CancellationToken::new();
        let handle = tokio::spawn(write_loop(sink, rx, failed.clone(), connection_id));

        Self {
            outbox: Outbox { tx },
            handle,
            failed,
        }
    }

    /// A new handle to the queue.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Resolves when a write has failed and the task has stopped.
    pub fn failed(&self) -> WaitForCancellationFuture<'_> {
        self.failed.cancelled()
    }

    /// Flush queued frames and close the connection.
    ///
    /// Completes once every other [`Outbox`] clone has been dropped and the
    /// queue is empty, or aborts the task after `timeout`.
    pub async fn close(mut self, timeout: Duration) -> TunnelResult<()> {
        drop(self.outbox);

        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Writer task panicked");
                Err(TunnelError::Closed)
            }
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Writer did not finish, aborting");
                self.handle.abort();
                Ok(())
            }
        }
    }
}

async fn write_loop(
    mut sink: WsSink,
    mut rx: mpsc::Receiver<Envelope>,
    failed: CancellationToken,
    connection_id: ConnectionId,
) -> TunnelResult<()> {
    while let Some(envelope) = rx.recv().await {
        let result = match codec::encode(&envelope) {
            Ok(text) => sink.send(Message::Text(text.into())).await.map_err(TunnelError::from),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            tracing::warn!(connection_id = %connection_id, error = %e, "Write to relay failed");
            failed.cancel();
            return Err(e);
        }
    }

    // All outboxes dropped: this is the one place the connection is closed.
    if let Err(e) = sink.close().await {
        tracing::debug!(connection_id = %connection_id, error = %e, "Close handshake failed");
    }
    tracing::debug!(connection_id = %connection_id, "Relay connection closed");
    Ok(())
}
