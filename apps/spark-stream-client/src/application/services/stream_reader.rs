//! Stream Reader
//!
//! Drives one request/response cycle over an open duplex connection:
//! sends the request, then receives and folds frames until the answer is
//! complete, the service reports an error, or the stream ends.
//!
//! The receive loop is bounded by an overall deadline and a frame ceiling
//! and can be aborted through a [`CancellationToken`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{ChatError, ChatFailure, TimeoutCause};
use crate::application::ports::DuplexConnection;
use crate::domain::answer::{Answer, AnswerAssembler, FrameOutcome};
use crate::domain::conversation::ChatRequest;
use crate::infrastructure::config::StreamSettings;
use crate::infrastructure::spark::FrameCodec;

/// Reads one streamed answer.
#[derive(Debug, Clone)]
pub struct StreamReader {
    codec: FrameCodec,
    settings: StreamSettings,
    cancel: CancellationToken,
}

impl Default for StreamReader {
    fn default() -> Self {
        Self::new(StreamSettings::default())
    }
}

impl StreamReader {
    /// Create a reader with the given bounds.
    #[must_use]
    pub fn new(settings: StreamSettings) -> Self {
        Self {
            codec: FrameCodec::new(),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the receive loop when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send `request` and assemble the streamed answer.
    ///
    /// End-of-stream before the last frame is a success unless
    /// `require_last_frame` is set.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatFailure`] carrying the partial answer when sending,
    /// receiving or parsing fails, the service reports an error, a bound is
    /// hit, or the call is cancelled.
    pub async fn run<C>(
        &self,
        connection: &mut C,
        request: &ChatRequest,
    ) -> Result<Answer, ChatFailure>
    where
        C: DuplexConnection + ?Sized,
    {
        let payload = self.codec.encode(request).map_err(ChatError::Encode)?;

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ChatError::Cancelled.into()),
            sent = connection.send_message(payload) => sent.map_err(ChatError::SendFailed)?,
        }
        tracing::debug!(uid = %request.uid(), "Request sent");

        let deadline = self
            .settings
            .deadline
            .map(|limit| (Instant::now() + limit, limit));
        let mut assembler = AnswerAssembler::new();

        loop {
            if let Some(max) = self.settings.max_frames
                && assembler.frames() >= max
            {
                tracing::warn!(max, "Frame limit reached");
                return Err(fail(
                    ChatError::Timeout(TimeoutCause::FrameLimit(max)),
                    assembler,
                ));
            }

            let received = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::info!(frames = assembler.frames(), "Stream cancelled");
                    return Err(fail(ChatError::Cancelled, assembler));
                }
                limit = wait_for_deadline(deadline) => {
                    tracing::warn!(frames = assembler.frames(), "Stream deadline elapsed");
                    return Err(fail(
                        ChatError::Timeout(TimeoutCause::Deadline(limit)),
                        assembler,
                    ));
                }
                received = connection.receive_message() => received,
            };

            let text = match received {
                Ok(Some(text)) => text,
                Ok(None) => {
                    if self.settings.require_last_frame {
                        tracing::warn!(
                            frames = assembler.frames(),
                            "Stream ended without last frame"
                        );
                        let frames = assembler.frames();
                        return Err(fail(ChatError::IncompleteStream { frames }, assembler));
                    }
                    tracing::info!(
                        frames = assembler.frames(),
                        chars = assembler.text().chars().count(),
                        "Stream ended"
                    );
                    return Ok(assembler.finish());
                }
                Err(e) => {
                    tracing::error!(error = %e, frames = assembler.frames(), "Receive failed");
                    return Err(fail(ChatError::ReceiveFailed(e), assembler));
                }
            };

            let frame = match self.codec.decode(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Malformed frame");
                    return Err(fail(ChatError::MalformedFrame(e), assembler));
                }
            };

            tracing::debug!(
                sid = %frame.header.sid,
                code = frame.header.code,
                status = ?frame.header.status,
                "Frame received"
            );

            match assembler.apply(&frame) {
                FrameOutcome::Continue => {}
                FrameOutcome::Complete => {
                    let answer = assembler.finish();
                    tracing::info!(
                        sid = answer.sid.as_deref().unwrap_or_default(),
                        frames = answer.frames,
                        total_tokens = answer.usage.map_or(0, |u| u.total_tokens),
                        "Answer complete"
                    );
                    return Ok(answer);
                }
                FrameOutcome::Rejected { code, message, sid } => {
                    tracing::error!(code, sid = %sid, message = %message, "Service error");
                    return Err(fail(
                        ChatError::ServiceError { code, message, sid },
                        assembler,
                    ));
                }
            }
        }
    }
}

fn fail(error: ChatError, assembler: AnswerAssembler) -> ChatFailure {
    ChatFailure::new(error, assembler.finish())
}

/// Resolve with the configured limit once the deadline passes; never
/// resolve when unbounded.
async fn wait_for_deadline(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, limit)) => {
            tokio::time::sleep_until(at).await;
            limit
        }
        None => std::future::pending().await,
    }
}
