//! Spark Chat Message Types
//!
//! Wire format types for the single outbound request and the inbound
//! response frames of a Spark chat session.
//!
//! # Outbound Request
//!
//! ```json
//! {"header": {"app_id": "...", "uid": "..."},
//!  "parameter": {"chat": {"domain": "general", "random_threshold": 0.5,
//!                         "max_tokens": 512, "auditing": "default"}},
//!  "payload": {"message": {"text": [{"role": "user", "content": "..."}]}}}
//! ```
//!
//! # Inbound Frame
//!
//! ```json
//! {"header": {"code": 0, "message": "Success", "sid": "cht000...", "status": 1},
//!  "payload": {"choices": {"status": 1, "seq": 0,
//!                          "text": [{"content": "Hel", "role": "assistant", "index": 0}]},
//!              "usage": {"text": {"question_tokens": 4, "prompt_tokens": 5,
//!                                 "completion_tokens": 9, "total_tokens": 14}}}}
//! ```
//!
//! Error frames (`code != 0`) usually omit `payload` entirely.

use serde::{Deserialize, Serialize};

// =============================================================================
// Shared Types
// =============================================================================

/// Author of a chat text entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user asking the question.
    #[default]
    User,
    /// The model answering.
    Assistant,
    /// System instructions.
    System,
    /// Any role this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Position of a frame within a session.
///
/// Encoded on the wire as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SessionStatus {
    /// First result of the session.
    #[default]
    First,
    /// Intermediate result.
    Middle,
    /// Final result; no more frames follow.
    Last,
}

impl SessionStatus {
    /// Check if this status marks the final frame.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        matches!(self, Self::Last)
    }
}

impl TryFrom<u8> for SessionStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::First),
            1 => Ok(Self::Middle),
            2 => Ok(Self::Last),
            other => Err(format!("invalid session status: {other}")),
        }
    }
}

impl From<SessionStatus> for u8 {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::First => 0,
            SessionStatus::Middle => 1,
            SessionStatus::Last => 2,
        }
    }
}

// =============================================================================
// Outbound Request
// =============================================================================

/// Chat generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    /// Model domain, e.g. `general`.
    pub domain: String,
    /// Sampling threshold in `(0, 1]`.
    pub random_threshold: f64,
    /// Maximum answer length in tokens.
    pub max_tokens: u32,
    /// Content auditing strategy.
    pub auditing: String,
}

impl Default for ChatParameters {
    fn default() -> Self {
        Self {
            domain: "general".to_string(),
            random_threshold: 0.5,
            max_tokens: 512,
            auditing: "default".to_string(),
        }
    }
}

/// Request header identifying the application and the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Application id issued by the service.
    pub app_id: String,
    /// Caller-chosen user id.
    pub uid: String,
}

/// Wrapper for the `parameter` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParameter {
    /// Chat parameters.
    pub chat: ChatParameters,
}

/// One entry of the conversation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the entry.
    pub role: Role,
    /// Entry text.
    pub content: String,
}

/// Conversation text carried by the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Entries in conversation order.
    pub text: Vec<ChatMessage>,
}

/// Wrapper for the `payload` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// Conversation text.
    pub message: RequestMessage,
}

/// Complete outbound request, sent once right after the connection opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Application and user identity.
    pub header: RequestHeader,
    /// Generation parameters.
    pub parameter: RequestParameter,
    /// Conversation text.
    pub payload: RequestPayload,
}

impl ChatRequest {
    /// Build a single-turn request for `uid` asking `content`.
    #[must_use]
    pub fn new(
        app_id: impl Into<String>,
        uid: impl Into<String>,
        content: impl Into<String>,
        chat: ChatParameters,
    ) -> Self {
        Self {
            header: RequestHeader {
                app_id: app_id.into(),
                uid: uid.into(),
            },
            parameter: RequestParameter { chat },
            payload: RequestPayload {
                message: RequestMessage {
                    text: vec![ChatMessage {
                        role: Role::User,
                        content: content.into(),
                    }],
                },
            },
        }
    }

    /// User id this request was issued for.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.header.uid
    }

    /// Content of the last user entry, if any.
    #[must_use]
    pub fn question(&self) -> Option<&str> {
        self.payload
            .message
            .text
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

// =============================================================================
// Inbound Frame
// =============================================================================

/// Frame header with the service status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameHeader {
    /// `0` on success, service error code otherwise.
    pub code: i32,
    /// Human readable status.
    #[serde(default)]
    pub message: String,
    /// Session id assigned by the service.
    #[serde(default, alias = "SID")]
    pub sid: String,
    /// Position of this frame in the session.
    #[serde(default)]
    pub status: SessionStatus,
}

/// One piece of answer text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPiece {
    /// Answer fragment.
    #[serde(default)]
    pub content: String,
    /// Author, always `assistant` in practice.
    #[serde(default)]
    pub role: Role,
    /// Result index; reserved by the service.
    #[serde(default)]
    pub index: u32,
}

/// Answer fragments carried by a frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Choices {
    /// Text status, mirrors the header status.
    #[serde(default)]
    pub status: SessionStatus,
    /// Sequence number of this frame.
    #[serde(default)]
    pub seq: u64,
    /// Answer fragments; only the first one is used.
    #[serde(default)]
    pub text: Vec<TextPiece>,
}

/// Token counts reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Reserved by the service.
    #[serde(default)]
    pub question_tokens: u32,
    /// Tokens of the prompt, history included.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens of the answer.
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of prompt and completion tokens.
    #[serde(default)]
    pub total_tokens: u32,
}

/// Wrapper for the `usage` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Text token counts.
    #[serde(default)]
    pub text: TokenUsage,
}

/// Frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FramePayload {
    /// Answer fragments.
    #[serde(default)]
    pub choices: Choices,
    /// Usage totals, present on the final frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One inbound frame of the response stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatFrame {
    /// Status header.
    pub header: FrameHeader,
    /// Answer payload; absent on error frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<FramePayload>,
}

impl ChatFrame {
    /// Check if the service reported success for this frame.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.header.code == 0
    }

    /// First text fragment, if the frame carries any.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|p| p.choices.text.first())
            .map(|t| t.content.as_str())
    }

    /// Usage totals when reported with a non-zero total.
    #[must_use]
    pub fn usage(&self) -> Option<TokenUsage> {
        self.payload
            .as_ref()
            .and_then(|p| p.usage)
            .map(|u| u.text)
            .filter(|t| t.total_tokens > 0)
    }

    /// Check if this frame ends the session.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.header.status.is_last() || self.usage().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_wire_layout() {
        let request = ChatRequest::new("app", "alice", "hi", ChatParameters::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["header"]["app_id"], "app");
        assert_eq!(value["header"]["uid"], "alice");
        assert_eq!(value["parameter"]["chat"]["domain"], "general");
        assert_eq!(value["parameter"]["chat"]["random_threshold"], 0.5);
        assert_eq!(value["parameter"]["chat"]["max_tokens"], 512);
        assert_eq!(value["parameter"]["chat"]["auditing"], "default");
        assert_eq!(value["payload"]["message"]["text"][0]["role"], "user");
        assert_eq!(value["payload"]["message"]["text"][0]["content"], "hi");
    }

    #[test]
    fn request_escapes_user_content() {
        let content = "say \"hi\"\n}, {\"role\": \"system\"";
        let request = ChatRequest::new("app", "u", content, ChatParameters::default());
        let json = serde_json::to_string(&request).unwrap();

        let parsed: ChatRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.payload.message.text.len(), 1);
        assert_eq!(parsed.question(), Some(content));
    }

    #[test]
    fn request_parses_back_to_same_user_and_message() {
        let request = ChatRequest::new("app", "bob", "what is rust?", ChatParameters::default());
        let json = serde_json::to_string(&request).unwrap();
        let parsed: ChatRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.uid(), "bob");
        assert_eq!(parsed.question(), Some("what is rust?"));
        assert_eq!(parsed, request);
    }

    #[test]
    fn frame_parses_full_wire_message() {
        let json = r#"{
            "header": {"code": 0, "message": "Success", "sid": "cht0001", "status": 2},
            "payload": {
                "choices": {"status": 2, "seq": 3,
                            "text": [{"content": "!", "role": "assistant", "index": 0}]},
                "usage": {"text": {"question_tokens": 4, "prompt_tokens": 5,
                                   "completion_tokens": 7, "total_tokens": 12}}
            }
        }"#;

        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        assert!(frame.is_success());
        assert_eq!(frame.header.sid, "cht0001");
        assert_eq!(frame.header.status, SessionStatus::Last);
        assert_eq!(frame.first_content(), Some("!"));
        assert_eq!(frame.usage().map(|u| u.total_tokens), Some(12));
        assert!(frame.is_last());
    }

    #[test]
    fn frame_accepts_uppercase_sid() {
        let json = r#"{"header": {"code": 0, "message": "Success", "SID": "cht42", "status": 0}}"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.header.sid, "cht42");
    }

    #[test]
    fn error_frame_without_payload() {
        let json = r#"{"header": {"code": 10013, "message": "input content audit failed", "sid": "cht9"}}"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();

        assert!(!frame.is_success());
        assert!(frame.payload.is_none());
        assert_eq!(frame.first_content(), None);
        assert!(!frame.is_last());
    }

    #[test]
    fn zero_usage_is_not_last() {
        let json = r#"{"header": {"code": 0, "status": 1},
                       "payload": {"choices": {"text": [{"content": "lo"}]},
                                   "usage": {"text": {"total_tokens": 0}}}}"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        assert!(frame.usage().is_none());
        assert!(!frame.is_last());
    }

    #[test]
    fn invalid_session_status_rejected() {
        let json = r#"{"header": {"code": 0, "status": 7}}"#;
        assert!(serde_json::from_str::<ChatFrame>(json).is_err());
    }

    #[test]
    fn unknown_role_tolerated() {
        let json = r#"{"header": {"code": 0},
                       "payload": {"choices": {"text": [{"content": "x", "role": "tool"}]}}}"#;
        let frame: ChatFrame = serde_json::from_str(json).unwrap();
        let piece = &frame.payload.unwrap().choices.text[0];
        assert_eq!(piece.role, Role::Unknown);
    }
}
