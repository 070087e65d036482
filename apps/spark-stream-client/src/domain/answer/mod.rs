//! Answer Assembly
//!
//! State machine that folds inbound [`ChatFrame`]s into the final answer.
//!
//! ```text
//! AwaitingFirstFrame ──frame──► ReceivingMiddleFrames ──last──► Done
//!         │                              │
//!         └────────── code != 0 ─────────┴──────────────────► Failed
//! ```
//!
//! A frame is the last one when its header status is `2` or it reports a
//! non-zero `total_tokens`. The answer text only ever grows.

use crate::domain::conversation::{ChatFrame, TokenUsage};

/// Assembly state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssemblyState {
    /// No frame received yet.
    #[default]
    AwaitingFirstFrame,
    /// At least one frame received, more expected.
    ReceivingMiddleFrames,
    /// Final frame received.
    Done,
    /// The service reported an error.
    Failed,
}

impl AssemblyState {
    /// Check if no more frames will be accepted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Result of applying one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// More frames expected.
    Continue,
    /// The answer is complete.
    Complete,
    /// The service rejected the request.
    Rejected {
        /// Service error code.
        code: i32,
        /// Service error message.
        message: String,
        /// Session id, if assigned.
        sid: String,
    },
}

/// Final assembled answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Answer {
    /// Concatenated answer text.
    pub text: String,
    /// Session id reported by the service.
    pub sid: Option<String>,
    /// Usage totals from the final frame.
    pub usage: Option<TokenUsage>,
    /// Number of frames received.
    pub frames: usize,
    /// Whether an explicit last-frame marker was seen.
    pub complete: bool,
}

/// Folds frames into an [`Answer`].
#[derive(Debug, Default)]
pub struct AnswerAssembler {
    state: AssemblyState,
    answer: Answer,
    terminal: Option<FrameOutcome>,
}

impl AnswerAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AssemblyState {
        self.state
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.answer.text
    }

    /// Frames applied so far.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.answer.frames
    }

    /// Apply one frame.
    ///
    /// Frames arriving after a terminal state are ignored and report the
    /// terminal outcome again without touching the text.
    pub fn apply(&mut self, frame: &ChatFrame) -> FrameOutcome {
        if let Some(outcome) = &self.terminal {
            return outcome.clone();
        }

        self.answer.frames += 1;
        if !frame.header.sid.is_empty() {
            self.answer.sid = Some(frame.header.sid.clone());
        }

        if !frame.is_success() {
            let outcome = FrameOutcome::Rejected {
                code: frame.header.code,
                message: frame.header.message.clone(),
                sid: frame.header.sid.clone(),
            };
            self.state = AssemblyState::Failed;
            self.terminal = Some(outcome.clone());
            return outcome;
        }

        if let Some(content) = frame.first_content() {
            self.answer.text.push_str(content);
        }

        if frame.is_last() {
            self.answer.usage = frame.usage();
            self.answer.complete = true;
            self.state = AssemblyState::Done;
            self.terminal = Some(FrameOutcome::Complete);
            FrameOutcome::Complete
        } else {
            self.state = AssemblyState::ReceivingMiddleFrames;
            FrameOutcome::Continue
        }
    }

    /// Consume the assembler and return the answer.
    #[must_use]
    pub fn finish(self) -> Answer {
        self.answer
    }
}
