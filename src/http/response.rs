//! Response envelope construction.
//!
//! # Responsibilities
//! - Map a local HTTP response into a `response` envelope
//! - Build synthetic JSON error responses (403, 400, 502)
//!
//! # Design Decisions
//! - Bodies are fully buffered; the wire carries them base64-encoded
//! - Multi-valued headers are joined with ", "

use std::collections::HashMap;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::protocol::codec::encode_body;
use crate::protocol::ResponseEnvelope;

/// Build a `response` envelope with a `{"error": message}` JSON body.
pub fn json_error(id: &str, status: StatusCode, message: &str) -> ResponseEnvelope {
    let body = serde_json::json!({ "error": message }).to_string();

    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    ResponseEnvelope {
        id: id.to_string(),
        status: status.as_u16(),
        headers,
        body_b64: encode_body(body.as_bytes()),
    }
}

/// Build a `response` envelope from the local server's answer.
pub fn from_parts(id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ResponseEnvelope {
    ResponseEnvelope {
        id: id.to_string(),
        status: status.as_u16(),
        headers: collect_headers(headers),
        body_b64: encode_body(body),
    }
}

/// Flatten a header map into the wire's single-valued map.
pub fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    map
}
