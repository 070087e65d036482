//! Domain Layer - Chat wire types and answer assembly.
//!
//! This layer contains the request/frame types of a Spark chat session and
//! the state machine that turns frames into an answer. No I/O happens here.

/// Outbound request and inbound frame types.
pub mod conversation;

/// Frame-by-frame answer assembly.
pub mod answer;
