//! Request forwarding to the local server.
//!
//! # Responsibilities
//! - Gate each request through the path allowlist, both as received and as
//!   it will be sent after URL normalization
//! - Execute one HTTP call against the local target
//! - Map every outcome, including failures, into exactly one response envelope
//!
//! # Design Decisions
//! - Never returns an error: failures become 502 responses
//! - Redirects are passed back to the public client, not followed
//! - Each local call has a deadline (`local.request_timeout_secs`)

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, Method, StatusCode, Url};
use thiserror::Error;

use crate::config::LocalConfig;
use crate::http::request::{forwarded_headers, local_url, request_target};
use crate::http::response::{self, json_error};
use crate::protocol::codec::decode_body;
use crate::protocol::{RequestEnvelope, ResponseEnvelope};
use crate::security::allowlist::PathAllowlist;

/// Body of the 403 sent for paths outside the allowlist.
pub const PATH_NOT_ALLOWED: &str = "path not allowed";

/// Body of the 400 sent when the relay delivers a body that is not base64.
pub const INVALID_BODY: &str = "invalid request body encoding";

const BODY_PREVIEW_LIMIT: usize = 1024;

/// Reasons a local call produced no response.
#[derive(Debug, Error)]
enum ForwardError {
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid request path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{}", error_chain(.0))]
    Http(#[from] reqwest::Error),
}

/// Executes forwarded requests against the configured local server.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    client: Client,
    base_url: String,
    allowlist: Arc<PathAllowlist>,
}

impl RequestForwarder {
    /// Create a forwarder for the given local target.
    pub fn new(local: &LocalConfig, allowlist: Arc<PathAllowlist>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(local.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: local.base_url(),
            allowlist,
        })
    }

    /// Base URL of the local server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward one request and produce its response envelope.
    pub async fn forward(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let start_time = Instant::now();

        if !self.allowlist.allow(&request.path) {
            tracing::warn!(
                request_id = %request.id,
                method = %request.method,
                path = %request.path,
                "Path not allowed, rejecting"
            );
            return json_error(&request.id, StatusCode::FORBIDDEN, PATH_NOT_ALLOWED);
        }

        let url = match local_url(&self.base_url, &request.path) {
            Ok(url) => url,
            Err(source) => {
                let e = ForwardError::InvalidPath {
                    path: request.path.clone(),
                    source,
                };
                tracing::error!(request_id = %request.id, error = %e, "Local request failed");
                return json_error(&request.id, StatusCode::BAD_GATEWAY, &e.to_string());
            }
        };

        // The allowlist must also hold for what is actually sent.
        let target = request_target(&url);
        if target != request.path && !self.allowlist.allow(&target) {
            tracing::warn!(
                request_id = %request.id,
                method = %request.method,
                path = %request.path,
                target = %target,
                "Normalized path not allowed, rejecting"
            );
            return json_error(&request.id, StatusCode::FORBIDDEN, PATH_NOT_ALLOWED);
        }

        let body = match decode_body(request.body_b64.as_deref()) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "Rejecting request body");
                return json_error(&request.id, StatusCode::BAD_REQUEST, INVALID_BODY);
            }
        };

        tracing::debug!(
            request_id = %request.id,
            headers = ?request.headers,
            body = %preview(body.as_deref().unwrap_or_default()),
            "Forwarding request"
        );

        match self.execute(&request, url, body).await {
            Ok(response) => {
                tracing::info!(
                    request_id = %request.id,
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    "Forwarded request"
                );
                response
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request.id,
                    method = %request.method,
                    path = %request.path,
                    error = %e,
                    "Local request failed"
                );
                json_error(&request.id, StatusCode::BAD_GATEWAY, &e.to_string())
            }
        }
    }

    async fn execute(
        &self,
        request: &RequestEnvelope,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<ResponseEnvelope, ForwardError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ForwardError::InvalidMethod(request.method.clone()))?;

        let mut builder = self
            .client
            .request(method, url)
            .headers(forwarded_headers(&request.headers));
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let local = builder.send().await?;
        let status = local.status();
        let headers = local.headers().clone();
        let bytes = local.bytes().await?;

        tracing::debug!(
            request_id = %request.id,
            status = status.as_u16(),
            headers = ?headers,
            body = %preview(&bytes),
            "Local response"
        );

        Ok(response::from_parts(&request.id, status, &headers, &bytes))
    }
}

/// Render an error with its source chain, e.g. "error sending request: connection refused".
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }
    message
}

fn preview(bytes: &[u8]) -> String {
    let end = bytes.len().min(BODY_PREVIEW_LIMIT);
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    if bytes.len() > end {
        text.push_str("...");
    }
    text
}
