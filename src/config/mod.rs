//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TunnelConfig (validated, immutable)
//!     → handed to the session engine at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the engine never re-reads it
//! - Identity and local port are required; everything else has defaults
//! - Any config error is fatal at startup, never retried

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{LocalConfig, SessionConfig, TunnelConfig};
