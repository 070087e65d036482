//! Chat Call Errors
//!
//! Every failed call returns a [`ChatFailure`]: the error kind plus whatever
//! answer text was assembled before the failure.

use std::time::Duration;

use crate::application::ports::TransportError;
use crate::domain::answer::Answer;
use crate::infrastructure::spark::{CodecError, SignerError};

/// Which bound stopped the receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// The overall deadline elapsed.
    Deadline(Duration),
    /// The frame ceiling was reached.
    FrameLimit(usize),
}

impl std::fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deadline(limit) => write!(f, "deadline of {}ms elapsed", limit.as_millis()),
            Self::FrameLimit(max) => write!(f, "frame limit of {max} reached"),
        }
    }
}

/// Error kinds of a chat call.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The connection URL could not be signed (malformed endpoint).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] SignerError),

    /// The connection could not be opened.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] TransportError),

    /// The request could not be encoded.
    #[error("request encoding failed: {0}")]
    Encode(#[source] CodecError),

    /// The request could not be delivered.
    #[error("send failed: {0}")]
    SendFailed(#[source] TransportError),

    /// The transport failed mid-stream.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] TransportError),

    /// The service rejected the request.
    #[error("service error ({code}): {message}")]
    ServiceError {
        /// Service error code.
        code: i32,
        /// Service error message.
        message: String,
        /// Session id, empty if none was assigned.
        sid: String,
    },

    /// An inbound message could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] CodecError),

    /// The receive loop hit one of its bounds.
    #[error("timeout: {0}")]
    Timeout(TimeoutCause),

    /// The stream ended before the last frame arrived.
    #[error("stream ended after {frames} frames without a last-frame marker")]
    IncompleteStream {
        /// Frames received before the stream ended.
        frames: usize,
    },

    /// The caller cancelled the call.
    #[error("cancelled")]
    Cancelled,
}

impl ChatError {
    /// Service error code, if the service rejected the request.
    #[must_use]
    pub const fn service_code(&self) -> Option<i32> {
        match self {
            Self::ServiceError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A failed chat call with the partial answer assembled so far.
#[derive(Debug, thiserror::Error)]
#[error("chat call failed after {} frames", partial.frames)]
pub struct ChatFailure {
    /// What went wrong.
    #[source]
    pub error: ChatError,
    /// Answer assembled before the failure.
    pub partial: Answer,
}

impl ChatFailure {
    /// Create a failure carrying a partial answer.
    #[must_use]
    pub const fn new(error: ChatError, partial: Answer) -> Self {
        Self { error, partial }
    }

    /// Create a failure that happened before any frame arrived.
    #[must_use]
    pub fn without_answer(error: ChatError) -> Self {
        Self::new(error, Answer::default())
    }

    /// Partial answer text.
    #[must_use]
    pub fn partial_text(&self) -> &str {
        &self.partial.text
    }
}

impl From<ChatError> for ChatFailure {
    fn from(error: ChatError) -> Self {
        Self::without_answer(error)
    }
}
