//! Relay tunnel client.
//!
//! Exposes a local HTTP server under a public hostname by keeping a
//! WebSocket session open to a relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    TUNNEL CLIENT                      │
//!                      │                                                       │
//!   Relay server       │  ┌──────────┐   ┌───────────┐   ┌────────────────┐    │
//!   ◀══ WebSocket ═════┼══│   net    │──▶│  session  │──▶│ security       │    │
//!   (wss://user.host)  │  │connection│   │  engine   │   │ allowlist      │    │
//!                      │  └──────────┘   └─────┬─────┘   └───────┬────────┘    │
//!                      │        ▲              │                 ▼             │
//!                      │  ┌─────┴────┐   ┌─────┴─────┐   ┌────────────────┐    │   Local
//!                      │  │  writer  │◀──│ heartbeat │   │ http forwarder │────┼──▶ server
//!                      │  │ (outbox) │◀──┴───────────┴───│   (reqwest)    │    │
//!                      │  └──────────┘                   └────────────────┘    │
//!                      │                                                       │
//!                      │  config · lifecycle · resilience · observability      │
//!                      └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use relay_tunnel::config::load_config;
use relay_tunnel::lifecycle::signals::spawn_signal_listener;
use relay_tunnel::lifecycle::Shutdown;
use relay_tunnel::observability::logging;
use relay_tunnel::{SessionEngine, TunnelError};

#[derive(Parser)]
#[command(name = "relay-tunnel", version)]
#[command(about = "Expose a local HTTP server through a relay tunnel", long_about = None)]
struct Cli {
    /// Trace request/response headers and bodies.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tunnel.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    tracing::info!("relay-tunnel v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::from(2);
        }
    };

    tracing::info!(
        username = %config.username,
        server = %config.server,
        local = %config.local.base_url(),
        allowed_paths = config.local.allowed_paths.len(),
        "Configuration loaded"
    );

    let mut engine = match SessionEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize session");
            return ExitCode::from(2);
        }
    };

    relay_tunnel::net::install_crypto_provider();

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    match engine.run(shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(TunnelError::Unauthorized(message)) => {
            tracing::error!(
                message = %message,
                "Relay rejected the credentials; check username and token"
            );
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = %e, "Tunnel stopped");
            ExitCode::from(1)
        }
    }
}
