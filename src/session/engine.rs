//! Session engine: connection lifecycle and message dispatch.
//!
//! # Responsibilities
//! - Connect to the relay and authenticate
//! - Dispatch inbound frames while ready (requests, pings, errors)
//! - Run the heartbeat alongside the dispatch loop
//! - Reconnect with exponential backoff after transport failures
//! - Terminate on relay error frames and on stop
//!
//! # Design Decisions
//! - Every connection attempt owns its own connection halves; they are
//!   passed into the writer and the dispatch loop, never stored on the engine
//! - Requests are forwarded concurrently, bounded by `max_in_flight`
//! - All writes go through one writer task
//! - Stop interrupts connects, reads, queue waits and backoff sleeps directly
//! - Shutdown is bounded: drain grace for in-flight requests, then a short close

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, SessionConfig, TunnelConfig};
use crate::error::{TunnelError, TunnelResult};
use crate::http::RequestForwarder;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionId, RelayConnection, WsSource};
use crate::protocol::{codec, Envelope, RequestEnvelope};
use crate::resilience::Backoff;
use crate::security::allowlist::PathAllowlist;
use crate::session::heartbeat::HeartbeatTask;
use crate::session::state::SessionState;
use crate::session::writer::{Outbox, Writer};

/// Time allowed for the writer to flush and close a connection.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Credentials presented to the relay.
#[derive(Clone)]
pub struct Identity {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Why the dispatch loop of a ready connection ended.
enum DispatchExit {
    Stopped,
    Failed(TunnelError),
    WriterFailed,
}

/// Drives one tunnel session across any number of connection attempts.
pub struct SessionEngine {
    identity: Identity,
    relay_url: String,
    forwarder: Arc<RequestForwarder>,
    settings: SessionConfig,
    backoff: Backoff,
    state: watch::Sender<SessionState>,
}

impl SessionEngine {
    /// Build an engine from validated configuration.
    pub fn from_config(config: &TunnelConfig) -> TunnelResult<Self> {
        let allowlist = PathAllowlist::new(&config.local.allowed_paths).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidPattern(e.to_string())])
        })?;
        let forwarder = RequestForwarder::new(&config.local, Arc::new(allowlist))?;

        let identity = Identity {
            username: config.username.clone(),
            token: config.token.clone(),
        };

        Ok(Self::new(
            identity,
            config.relay_url(),
            forwarder,
            config.session.clone(),
        ))
    }

    pub fn new(
        identity: Identity,
        relay_url: String,
        forwarder: RequestForwarder,
        settings: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            identity,
            relay_url,
            forwarder: Arc::new(forwarder),
            settings,
            backoff: Backoff::new(),
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Run until stopped (`Ok`) or until the relay ends the session (`Err`).
    pub async fn run(&mut self, shutdown: Shutdown) -> TunnelResult<()> {
        tracing::info!(
            relay_url = %self.relay_url,
            username = %self.identity.username,
            local = %self.forwarder.base_url(),
            "Tunnel session starting"
        );

        let result = self.run_until_stopped(&shutdown).await;

        match &result {
            Ok(()) => {
                if self.state() != SessionState::Draining {
                    self.set_state(SessionState::Draining);
                }
                tracing::info!("Tunnel session stopped");
            }
            Err(e) => tracing::error!(error = %e, "Tunnel session terminated"),
        }
        self.set_state(SessionState::Terminated);

        result
    }

    async fn run_until_stopped(&mut self, shutdown: &Shutdown) -> TunnelResult<()> {
        let connect_timeout = Duration::from_secs(self.settings.connect_timeout_secs);

        loop {
            if shutdown.is_triggered() {
                return Ok(());
            }

            self.set_state(SessionState::Connecting);
            let attempt = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                res = RelayConnection::connect(&self.relay_url, connect_timeout) => res,
            };

            let err = match attempt {
                Ok(connection) => match self.run_connection(connection, shutdown).await {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                },
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            self.set_state(SessionState::Idle);
            let delay = self.backoff.next_delay();
            tracing::warn!(
                error = %err,
                delay_secs = delay.as_secs(),
                "Relay connection failed, reconnecting"
            );

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Authenticate and serve one connection. `Ok` means stop was requested.
    async fn run_connection(
        &mut self,
        connection: RelayConnection,
        shutdown: &Shutdown,
    ) -> TunnelResult<()> {
        let connection_id = connection.id();
        let (sink, mut source) = connection.split();
        let writer = Writer::spawn(sink, self.settings.max_in_flight * 2, connection_id);
        let outbox = writer.outbox();

        self.set_state(SessionState::Authenticating);
        let authenticated = match outbox
            .send(Envelope::ready(&self.identity.username, &self.identity.token))
            .await
        {
            Ok(()) => self.authenticate(connection_id, &mut source, shutdown).await,
            Err(e) => Err(e),
        };

        match authenticated {
            Ok(true) => {}
            Ok(false) => {
                self.set_state(SessionState::Draining);
                drop(outbox);
                writer.close(CLOSE_TIMEOUT).await.ok();
                return Ok(());
            }
            Err(e) => {
                drop(outbox);
                let write_result = writer.close(CLOSE_TIMEOUT).await;
                // A failed credentials write surfaces as Closed; report the write error instead.
                return Err(match (e, write_result) {
                    (TunnelError::Closed, Err(write_err)) => write_err,
                    (e, _) => e,
                });
            }
        }

        self.set_state(SessionState::Ready);
        self.backoff.reset();
        tracing::info!(
            connection_id = %connection_id,
            username = %self.identity.username,
            local = %self.forwarder.base_url(),
            "Tunnel ready"
        );

        let heartbeat_cancel = CancellationToken::new();
        let heartbeat = tokio::spawn(
            HeartbeatTask::new(
                outbox.clone(),
                Duration::from_secs(self.settings.heartbeat_interval_secs),
            )
            .run(heartbeat_cancel.clone()),
        );

        let mut in_flight = JoinSet::new();
        let exit = self
            .dispatch_loop(connection_id, &mut source, &outbox, &writer, &mut in_flight, shutdown)
            .await;

        heartbeat_cancel.cancel();
        if let Err(e) = heartbeat.await {
            tracing::error!(error = %e, "Heartbeat task panicked");
        }

        match exit {
            DispatchExit::Stopped => {
                self.set_state(SessionState::Draining);
                self.drain(&mut in_flight).await;
                drop(outbox);
                if let Err(e) = writer.close(CLOSE_TIMEOUT).await {
                    tracing::debug!(error = %e, "Connection close failed during drain");
                }
                Ok(())
            }
            DispatchExit::Failed(e) => {
                in_flight.shutdown().await;
                drop(outbox);
                writer.close(CLOSE_TIMEOUT).await.ok();
                Err(e)
            }
            DispatchExit::WriterFailed => {
                in_flight.shutdown().await;
                drop(outbox);
                Err(writer.close(CLOSE_TIMEOUT).await.err().unwrap_or(TunnelError::Closed))
            }
        }
    }

    /// Wait for the relay's `ready`. Returns `Ok(false)` if stopped first.
    async fn authenticate(
        &self,
        connection_id: ConnectionId,
        source: &mut WsSource,
        shutdown: &Shutdown,
    ) -> TunnelResult<bool> {
        let secs = self.settings.connect_timeout_secs;
        let deadline = tokio::time::sleep(Duration::from_secs(secs));
        tokio::pin!(deadline);

        loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(false),
                _ = &mut deadline => {
                    return Err(TunnelError::Timeout { stage: "Authentication", secs });
                }
                frame = source.next() => frame,
            };

            match read_envelope(connection_id, frame)? {
                Some(Envelope::Ready(_)) => return Ok(true),
                Some(Envelope::Error { message }) => {
                    return Err(TunnelError::from_relay_message(message));
                }
                Some(other) => tracing::debug!(
                    connection_id = %connection_id,
                    kind = other.kind(),
                    "Ignoring frame before authentication"
                ),
                None => {}
            }
        }
    }

    async fn dispatch_loop(
        &self,
        connection_id: ConnectionId,
        source: &mut WsSource,
        outbox: &Outbox,
        writer: &Writer,
        in_flight: &mut JoinSet<()>,
        shutdown: &Shutdown,
    ) -> DispatchExit {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return DispatchExit::Stopped,
                _ = writer.failed() => return DispatchExit::WriterFailed,
                Some(res) = in_flight.join_next(), if !in_flight.is_empty() => log_join(res),
                frame = source.next() => {
                    let envelope = match read_envelope(connection_id, frame) {
                        Ok(Some(envelope)) => envelope,
                        Ok(None) => continue,
                        Err(e) => return DispatchExit::Failed(e),
                    };
                    if let Err(exit) = self.dispatch(envelope, outbox, writer, in_flight, shutdown).await {
                        return exit;
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        envelope: Envelope,
        outbox: &Outbox,
        writer: &Writer,
        in_flight: &mut JoinSet<()>,
        shutdown: &Shutdown,
    ) -> Result<(), DispatchExit> {
        match envelope {
            Envelope::Request(request) => {
                self.spawn_forward(request, outbox, writer, in_flight, shutdown).await;
                Ok(())
            }
            Envelope::Ping { id, .. } => queue(outbox, writer, shutdown, Envelope::pong(id)).await,
            Envelope::Pong { id } => {
                tracing::trace!(id = %id, "Pong received");
                Ok(())
            }
            Envelope::Ready(_) => {
                tracing::warn!("Unexpected ready frame after authentication, ignoring");
                Ok(())
            }
            Envelope::Error { message } => Err(DispatchExit::Failed(
                TunnelError::from_relay_message(message),
            )),
            Envelope::Response(response) => {
                tracing::warn!(id = %response.id, "Unexpected response frame from relay, ignoring");
                Ok(())
            }
            Envelope::Unknown { kind } => {
                tracing::warn!(kind = %kind, "Ignoring unrecognized frame type");
                Ok(())
            }
        }
    }

    /// Start forwarding one request; its response is queued when the local call finishes.
    async fn spawn_forward(
        &self,
        request: RequestEnvelope,
        outbox: &Outbox,
        writer: &Writer,
        in_flight: &mut JoinSet<()>,
        shutdown: &Shutdown,
    ) {
        while in_flight.len() >= self.settings.max_in_flight {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = writer.failed() => break,
                Some(res) = in_flight.join_next() => log_join(res),
            }
        }

        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            "Request received"
        );

        let forwarder = Arc::clone(&self.forwarder);
        let outbox = outbox.clone();
        in_flight.spawn(async move {
            let request_id = request.id.clone();
            let response = forwarder.forward(request).await;
            if outbox.send(Envelope::Response(response)).await.is_err() {
                tracing::warn!(
                    request_id = %request_id,
                    "Connection closed before response could be sent"
                );
            }
        });
    }

    /// Let in-flight requests finish within the grace period, then abandon the rest.
    async fn drain(&self, in_flight: &mut JoinSet<()>) {
        if in_flight.is_empty() {
            return;
        }

        let grace = self.drain_grace();
        tracing::info!(
            in_flight = in_flight.len(),
            grace_secs = grace.as_secs(),
            "Draining in-flight requests"
        );

        let finished = tokio::time::timeout(grace, async {
            while let Some(res) = in_flight.join_next().await {
                log_join(res);
            }
        })
        .await;

        if finished.is_err() {
            tracing::warn!(
                abandoned = in_flight.len(),
                "Drain grace period elapsed, abandoning requests"
            );
            in_flight.shutdown().await;
        }
    }

    fn drain_grace(&self) -> Duration {
        Duration::from_secs(self.settings.drain_grace_secs)
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Session state changed");
        }
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("identity", &self.identity)
            .field("relay_url", &self.relay_url)
            .field("state", &self.state())
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Turn one read result into an envelope.
///
/// `Ok(None)` means the frame carries nothing to dispatch (control frames,
/// binary frames, malformed JSON); errors mean the connection is unusable.
fn read_envelope(
    connection_id: ConnectionId,
    frame: Option<Result<Message, tungstenite::Error>>,
) -> TunnelResult<Option<Envelope>> {
    match frame {
        None => Err(TunnelError::Closed),
        Some(Err(e)) => Err(e.into()),
        Some(Ok(Message::Text(text))) => match codec::decode(&text) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::warn!(connection_id = %connection_id, error = %e, "Ignoring malformed frame");
                Ok(None)
            }
        },
        Some(Ok(Message::Close(frame))) => {
            tracing::debug!(connection_id = %connection_id, frame = ?frame, "Relay sent close frame");
            Err(TunnelError::Closed)
        }
        Some(Ok(Message::Binary(data))) => {
            tracing::warn!(connection_id = %connection_id, len = data.len(), "Ignoring binary frame");
            Ok(None)
        }
        Some(Ok(_)) => Ok(None),
    }
}

/// Queue a frame from the dispatch loop without losing sight of stop or a
/// failed writer while the queue is full.
async fn queue(
    outbox: &Outbox,
    writer: &Writer,
    shutdown: &Shutdown,
    envelope: Envelope,
) -> Result<(), DispatchExit> {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => Err(DispatchExit::Stopped),
        _ = writer.failed() => Err(DispatchExit::WriterFailed),
        res = outbox.send(envelope) => res.map_err(|_| DispatchExit::WriterFailed),
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "Forwarding task panicked");
        }
    }
}
