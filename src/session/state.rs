//! Session state machine.
//!
//! # States
//! - Idle: no connection; starting up or waiting out a backoff delay
//! - Connecting: WebSocket handshake in progress
//! - Authenticating: credentials sent, waiting for the relay's `ready`
//! - Ready: forwarding requests, heartbeat running
//! - Draining: stop requested, finishing in-flight work
//! - Terminated: no further transitions
//!
//! # State Transitions
//! ```text
//! Idle → Connecting: start, or backoff elapsed
//! Connecting → Authenticating: handshake succeeded, `ready` sent
//! Authenticating → Ready: relay answered `ready`
//! Connecting/Authenticating/Ready → Idle: retryable transport failure
//! Authenticating/Ready → Terminated: relay sent `error`
//! any → Draining → Terminated: stop requested
//! ```

use std::fmt;

/// Lifecycle state of a tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Authenticating,
    Ready,
    Draining,
    Terminated,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Draining => "draining",
            SessionState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
