//! Relay tunnel client library.
//!
//! Keeps a WebSocket session open to a relay server and forwards the HTTP
//! requests it receives to a local server.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod resilience;
pub mod security;
pub mod session;

pub use config::TunnelConfig;
pub use error::TunnelError;
pub use lifecycle::Shutdown;
pub use session::{SessionEngine, SessionState};
