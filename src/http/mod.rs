//! Local HTTP forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! request envelope
//!     → forwarder.rs (allowlist gate, body decode)
//!     → request.rs (local URL, header filtering)
//!     → reqwest call to the local server
//!     → response.rs (status/headers/body → response envelope)
//!     → back to the session writer
//! ```

pub mod forwarder;
pub mod request;
pub mod response;

pub use forwarder::RequestForwarder;
