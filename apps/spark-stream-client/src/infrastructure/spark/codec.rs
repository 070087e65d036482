//! Spark Frame Codec
//!
//! JSON encoding of the outbound [`ChatRequest`] and decoding of inbound
//! [`ChatFrame`]s. Every WebSocket text message carries exactly one frame
//! object; anything else is reported as malformed rather than skipped.

use crate::domain::conversation::{ChatFrame, ChatRequest};

/// Longest message prefix quoted in error messages.
const PREVIEW_LEN: usize = 80;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {source} (message: {preview})")]
    Json {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
        /// Leading part of the offending message.
        preview: String,
    },

    /// Message was not a JSON object.
    #[error("invalid message format: expected JSON object, got: {0}")]
    InvalidFormat(String),

    /// Request could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// JSON codec for the Spark chat stream.
#[derive(Debug, Default, Clone)]
pub struct FrameCodec;

impl FrameCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text message into a frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is not a JSON object or does not
    /// match the frame schema.
    pub fn decode(&self, text: &str) -> Result<ChatFrame, CodecError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(preview(trimmed)));
        }

        serde_json::from_str(trimmed).map_err(|source| CodecError::Json {
            source,
            preview: preview(trimmed),
        })
    }

    /// Encode a request to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, request: &ChatRequest) -> Result<String, CodecError> {
        serde_json::to_string(request).map_err(CodecError::Encode)
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
