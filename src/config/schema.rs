//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tunnel
//! client. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

/// Root configuration for the tunnel client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TunnelConfig {
    /// Account name; also the public subdomain.
    pub username: String,

    /// Secret presented to the relay during authentication.
    pub token: String,

    /// Relay server host, optionally with an explicit port (e.g., "localhost:8000").
    pub server: String,

    /// Local target settings.
    pub local: LocalConfig,

    /// Connection lifecycle tuning.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Local server that requests are forwarded to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalConfig {
    /// "http" or "https".
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Host of the local server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the local server.
    pub port: u16,

    /// Path patterns permitted to reach the local server. Empty = allow all.
    #[serde(default)]
    pub allowed_paths: Vec<String>,

    /// Total time allowed for one local request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Session engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between heartbeat pings in seconds.
    pub heartbeat_interval_secs: u64,

    /// Deadline for the transport handshake and for authentication, in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum number of requests forwarded concurrently.
    pub max_in_flight: usize,

    /// How long in-flight requests may keep running after a stop signal.
    pub drain_grace_secs: u64,

    /// Explicit relay endpoint, bypassing the `{username}.{server}` derivation.
    pub relay_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 15,
            connect_timeout_secs: 10,
            max_in_flight: 32,
            drain_grace_secs: 5,
            relay_url: None,
        }
    }
}

impl TunnelConfig {
    /// The relay endpoint for this account.
    ///
    /// A server string with an explicit port marks a plain-text development
    /// relay (`ws://`); otherwise the relay is reached over TLS (`wss://`).
    pub fn relay_url(&self) -> String {
        if let Some(url) = &self.session.relay_url {
            return url.clone();
        }

        let scheme = if self.server.contains(':') { "ws" } else { "wss" };
        format!("{}://{}.{}/ws", scheme, self.username, self.server)
    }
}

impl LocalConfig {
    /// Base URL of the local server, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}
