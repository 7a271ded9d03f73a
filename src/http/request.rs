//! Outbound request preparation.
//!
//! # Responsibilities
//! - Build the local target URL from the fixed base and the request path
//! - Report the path that will actually be sent, after URL normalization
//! - Convert wire headers into a header map, dropping `Host`

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, HOST};
use reqwest::Url;

/// Join the local base URL and the request path (query string included).
///
/// Parsing resolves dot segments, including percent-encoded ones, so the
/// result may name a different path than the one received.
pub fn local_url(base_url: &str, path: &str) -> Result<Url, url::ParseError> {
    if path.starts_with('/') {
        Url::parse(&format!("{}{}", base_url, path))
    } else {
        Url::parse(&format!("{}/{}", base_url, path))
    }
}

/// Path and query of a parsed URL, as they go out on the request line.
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Headers to send to the local server.
///
/// `Host` is removed so the local server sees its own host rather than the
/// public tunnel hostname. Names or values that are not valid HTTP are skipped.
pub fn forwarded_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!(header = %name, "Skipping invalid header name");
                continue;
            }
        };
        if name == HOST {
            continue;
        }
        match HeaderValue::from_str(value) {
            Ok(v) => {
                map.append(name, v);
            }
            Err(_) => tracing::debug!(header = %name, "Skipping invalid header value"),
        }
    }

    map
}
