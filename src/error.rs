//! Session and process level error definitions.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::protocol::codec::CodecError;

/// Errors that end a connection attempt or the whole run.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The relay rejected our credentials.
    #[error("Authentication rejected by relay: {0}")]
    Unauthorized(String),

    /// The relay actively ended the session with an error frame.
    #[error("Relay ended the session: {0}")]
    Rejected(String),

    /// WebSocket level failure (connect refused, read/write error, protocol error).
    #[error("Transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connect or authentication handshake did not finish in time.
    #[error("{stage} timed out after {secs} seconds")]
    Timeout { stage: &'static str, secs: u64 },

    /// The relay closed the connection.
    #[error("Connection closed by relay")]
    Closed,

    /// Outbound frame could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The local HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl TunnelError {
    /// Returns true if the session should back off and reconnect.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TunnelError::Transport(_) | TunnelError::Timeout { .. } | TunnelError::Closed
        )
    }

    /// Classify a relay `error` frame. Both outcomes are session-fatal.
    pub fn from_relay_message(message: String) -> Self {
        if message.to_ascii_lowercase().contains("unauthorized") {
            TunnelError::Unauthorized(message)
        } else {
            TunnelError::Rejected(message)
        }
    }
}

/// Result type for session operations.
pub type TunnelResult<T> = Result<T, TunnelError>;
