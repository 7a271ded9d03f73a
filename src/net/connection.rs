//! Relay connection establishment and identity.
//!
//! # Responsibilities
//! - Open the WebSocket to the relay with a deadline
//! - Give every connection attempt a unique id for tracing
//! - Hand the split halves to exactly one owner each (reader, writer)

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{TunnelError, TunnelResult};

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// The WebSocket stream type used for the relay.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a relay connection.
pub type WsSink = SplitSink<WsStream, Message>;

/// Read half of a relay connection.
pub type WsSource = SplitStream<WsStream>;

/// Select ring as the process-wide TLS crypto provider.
///
/// Must run before the first `wss://` connection. Later calls are no-ops.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("TLS crypto provider already installed");
    }
}

/// Unique identifier for one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An open relay connection owned by one connection attempt.
pub struct RelayConnection {
    id: ConnectionId,
    stream: WsStream,
}

impl RelayConnection {
    /// Open a WebSocket to `url`, failing after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> TunnelResult<Self> {
        let id = ConnectionId::new();
        tracing::debug!(connection_id = %id, url = %url, "Opening relay connection");

        let (stream, response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| TunnelError::Timeout {
                stage: "Connect",
                secs: timeout.as_secs(),
            })??;

        tracing::debug!(
            connection_id = %id,
            status = response.status().as_u16(),
            "Relay handshake complete"
        );

        Ok(Self { id, stream })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Split into the write and read halves.
    pub fn split(self) -> (WsSink, WsSource) {
        self.stream.split()
    }
}

impl std::fmt::Debug for RelayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConnection").field("id", &self.id).finish()
    }
}
