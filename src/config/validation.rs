//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check identity fields and the derived relay URL
//! - Validate value ranges (ports, intervals, limits)
//! - Compile allowlist patterns so bad patterns fail at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TunnelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::TunnelConfig;
use crate::security::allowlist::PathAllowlist;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("username '{0}' is not a valid DNS label")]
    InvalidUsername(String),

    #[error("local.protocol must be \"http\" or \"https\", got '{0}'")]
    InvalidProtocol(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("relay URL '{url}' is invalid: {reason}")]
    InvalidRelayUrl { url: String, reason: String },

    #[error("{0}")]
    InvalidPattern(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &TunnelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.username.is_empty() {
        errors.push(ValidationError::Empty("username"));
    } else if !is_dns_label(&config.username) {
        errors.push(ValidationError::InvalidUsername(config.username.clone()));
    }
    if config.token.is_empty() {
        errors.push(ValidationError::Empty("token"));
    }
    if config.server.is_empty() {
        errors.push(ValidationError::Empty("server"));
    }

    if config.local.protocol != "http" && config.local.protocol != "https" {
        errors.push(ValidationError::InvalidProtocol(config.local.protocol.clone()));
    }
    if config.local.host.is_empty() {
        errors.push(ValidationError::Empty("local.host"));
    }
    if config.local.port == 0 {
        errors.push(ValidationError::Zero("local.port"));
    }
    if config.local.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("local.request_timeout_secs"));
    }

    if let Err(e) = PathAllowlist::new(&config.local.allowed_paths) {
        errors.push(ValidationError::InvalidPattern(e.to_string()));
    }

    let session = &config.session;
    if session.heartbeat_interval_secs == 0 {
        errors.push(ValidationError::Zero("session.heartbeat_interval_secs"));
    }
    if session.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("session.connect_timeout_secs"));
    }
    if session.max_in_flight == 0 {
        errors.push(ValidationError::Zero("session.max_in_flight"));
    }

    // Only meaningful once the parts it is derived from are sane.
    if errors.is_empty() {
        let url = config.relay_url();
        match Url::parse(&url) {
            Ok(parsed) if parsed.scheme() == "ws" || parsed.scheme() == "wss" => {}
            Ok(parsed) => errors.push(ValidationError::InvalidRelayUrl {
                url: url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidRelayUrl {
                url: url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_dns_label(s: &str) -> bool {
    s.len() <= 63
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
