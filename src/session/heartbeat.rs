//! Heartbeat pings on an active connection.

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::protocol::Envelope;
use crate::session::writer::Outbox;

/// Periodically queues `ping` frames while the session is ready.
///
/// Ticks are measured from task start, not from the last successful send.
/// A failed send ends the task; the read side decides the connection's fate.
pub struct HeartbeatTask {
    outbox: Outbox,
    interval: Duration,
}

impl HeartbeatTask {
    pub fn new(outbox: Outbox, interval: Duration) -> Self {
        Self { outbox, interval }
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let ping = Envelope::ping();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.outbox.send(ping) => {
                    if res.is_err() {
                        tracing::debug!("Heartbeat stopped: connection closed");
                        break;
                    }
                    tracing::trace!("Heartbeat ping queued");
                }
            }
        }
    }
}
