//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connection attempt fails (retryable)
//!     → backoff.rs (sleep current delay, then double it, cap at 30s)
//!     → next attempt
//!
//! Authentication succeeds
//!     → backoff.rs reset to 1s
//! ```
//!
//! # Design Decisions
//! - Delay persists across consecutive failures; only success resets it
//! - No jitter; delays are exact
//! - Credential rejection is never retried (see session engine)

pub mod backoff;

pub use backoff::Backoff;
