//! Stream Codec
//!
//! Encodes outbound and decodes inbound JSON text frames. Inbound
//! frames are discriminated by their `type` field before full
//! deserialization so unrecognized types are reported distinctly from
//! malformed payloads (the client logs the former as a warning and
//! keeps the connection alive either way).

use crate::infrastructure::stream::messages::{ClientMessage, ServerMessage};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame carried a `type` this client does not recognize.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Frame was not a JSON object with a string `type` field.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the price stream protocol.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownMessageType`] for a well-formed
    /// frame with an unrecognized discriminator, and other variants
    /// for malformed payloads.
    pub fn decode(&self, text: &str) -> Result<ServerMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let Some(msg_type) = value.get("type").and_then(|v| v.as_str()) else {
            let preview: String = text.chars().take(80).collect();
            return Err(CodecError::InvalidFormat(format!(
                "missing `type` discriminator in: {preview}"
            )));
        };

        if !ServerMessage::KNOWN_TYPES.contains(&msg_type) {
            return Err(CodecError::UnknownMessageType(msg_type.to_string()));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Encode one outbound frame to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen with
    /// valid data).
    pub fn encode(&self, msg: &ClientMessage) -> Result<String, CodecError> {
        Ok(serde_json::to_string(msg)?)
    }
}
