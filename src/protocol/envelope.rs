//! Envelope definitions for the relay wire protocol.
//!
//! Every frame is a JSON text message with a `"type"` field naming the
//! variant in snake_case, e.g. `{"type":"pong","id":"..."}`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire names of every envelope kind this client understands.
pub const KNOWN_TYPES: [&str; 6] = ["ready", "error", "request", "response", "ping", "pong"];

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Client → server: credentials. Server → client: authentication accepted.
    Ready(Ready),

    /// Server → client: the relay is ending the session.
    Error {
        #[serde(default)]
        message: String,
    },

    /// Server → client: a public HTTP request to forward.
    Request(RequestEnvelope),

    /// Client → server: the local server's answer to a `request`.
    Response(ResponseEnvelope),

    /// Keepalive, either direction.
    Ping {
        id: String,
        #[serde(default)]
        at: f64,
    },

    /// Keepalive reply, either direction.
    Pong { id: String },

    /// A frame whose `type` this client does not recognize. Never sent.
    #[serde(skip)]
    Unknown { kind: String },
}

/// Payload of a `ready` frame. Empty when sent by the relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ready {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A forwarded HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub method: String,
    /// Path plus query string, used verbatim.
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body_b64: Option<String>,
}

/// The local server's answer, or a synthetic error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body_b64: String,
}

impl Envelope {
    /// Credentials frame sent right after the transport handshake.
    pub fn ready(username: &str, token: &str) -> Self {
        Envelope::Ready(Ready {
            username: Some(username.to_string()),
            token: Some(token.to_string()),
        })
    }

    /// Fresh heartbeat with a unique id and the current send time.
    pub fn ping() -> Self {
        Envelope::Ping {
            id: Uuid::new_v4().to_string(),
            at: unix_now(),
        }
    }

    pub fn pong(id: impl Into<String>) -> Self {
        Envelope::Pong { id: id.into() }
    }

    /// Wire name of this envelope's type.
    pub fn kind(&self) -> &str {
        match self {
            Envelope::Ready(_) => "ready",
            Envelope::Error { .. } => "error",
            Envelope::Request(_) => "request",
            Envelope::Response(_) => "response",
            Envelope::Ping { .. } => "ping",
            Envelope::Pong { .. } => "pong",
            Envelope::Unknown { kind } => kind,
        }
    }
}

/// Seconds since the unix epoch, with sub-second precision.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
