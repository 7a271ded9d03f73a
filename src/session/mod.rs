//! Tunnel session subsystem.
//!
//! # Data Flow
//! ```text
//! engine.rs
//!     → net::RelayConnection::connect
//!     → split: sink → writer.rs (single writer, Outbox queue)
//!              source → engine dispatch loop
//!     → `ready` handshake (state.rs: Authenticating → Ready)
//!     → heartbeat.rs (pings via Outbox)
//!     → request frames → http::RequestForwarder (JoinSet) → Outbox
//!
//! On transport failure:
//!     tear down attempt → resilience::Backoff delay → reconnect
//!
//! On stop:
//!     Draining → finish in-flight (bounded) → writer closes socket → Terminated
//! ```

pub mod engine;
pub mod heartbeat;
pub mod state;
pub mod writer;

pub use engine::{Identity, SessionEngine};
pub use state::SessionState;
