//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (request id, state, delay)
//!     → logging.rs subscriber (stderr, env-filtered)
//! ```
//!
//! # Design Decisions
//! - Request id flows through every forwarding log line
//! - Bodies and headers are only traced at debug level

pub mod logging;
