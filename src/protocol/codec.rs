//! JSON frame encoding and base64 body handling.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::protocol::envelope::{Envelope, KNOWN_TYPES};

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Frame is not valid JSON or does not fit the envelope shape.
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame has no string `type` field.
    #[error("Frame has no type field")]
    MissingType,

    /// Body is not valid base64.
    #[error("Invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Serialize an envelope into a text frame.
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse a text frame.
///
/// Frames with a well-formed but unrecognized `type` decode to
/// [`Envelope::Unknown`] instead of failing.
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(CodecError::MissingType)?;

    if !KNOWN_TYPES.contains(&kind) {
        return Ok(Envelope::Unknown {
            kind: kind.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}

/// Base64-encode a body for the wire.
pub fn encode_body(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a wire body. Absent and empty bodies both decode to `None`.
pub fn decode_body(body_b64: Option<&str>) -> Result<Option<Vec<u8>>, CodecError> {
    match body_b64 {
        None | Some("") => Ok(None),
        Some(encoded) => {
            let bytes = STANDARD.decode(encoded)?;
            Ok(if bytes.is_empty() { None } else { Some(bytes) })
        }
    }
}
