//! Relay wire protocol.
//!
//! # Data Flow
//! ```text
//! Inbound text frame
//!     → codec.rs (JSON parse, type dispatch)
//!     → Envelope (envelope.rs)
//!
//! Outbound Envelope
//!     → codec.rs (JSON encode)
//!     → text frame
//!
//! HTTP bodies travel base64-encoded in `body_b64`.
//! ```

pub mod codec;
pub mod envelope;

pub use codec::CodecError;
pub use envelope::{Envelope, Ready, RequestEnvelope, ResponseEnvelope};
