//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request frame from relay:
//!     → allowlist.rs (path must match a configured pattern)
//!     → Pass to http::RequestForwarder, or answer 403
//! ```
//!
//! # Design Decisions
//! - Fail closed: a configured but unmatched path never reaches the local server
//! - Patterns are compiled once at startup

pub mod allowlist;

pub use allowlist::PathAllowlist;
