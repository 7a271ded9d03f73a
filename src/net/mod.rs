//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! relay URL (wss://{username}.{server}/ws)
//!     → connection.rs (WebSocket handshake with deadline)
//!     → RelayConnection (owned by one attempt)
//!     → split: sink → session writer, source → dispatch loop
//! ```
//!
//! # Design Decisions
//! - TLS is delegated to tokio-tungstenite (rustls with the ring provider, native roots)
//! - A connection is never reused across attempts

pub mod connection;

pub use connection::{install_crypto_provider, ConnectionId, RelayConnection, WsSink, WsSource};
