//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!     second signal → immediate exit
//!
//! Shutdown (shutdown.rs):
//!     trigger → engine stops dispatch → drain in-flight → close connection → exit
//! ```
//!
//! # Design Decisions
//! - Stop is a cancellation token, not a polled flag
//! - Shutdown has a deadline: in-flight work is abandoned after the grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
