//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Pick the default level from the verbose flag
//!
//! # Design Decisions
//! - `RUST_LOG` always wins over the built-in defaults
//! - Verbose mode raises this crate to debug, which also enables
//!   header/body tracing in the forwarder

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for the given verbosity.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "relay_tunnel=debug"
    } else {
        "relay_tunnel=info"
    }
}

/// Install the global tracing subscriber.
pub fn init(verbose: bool) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbose).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
