//! Application Services
//!
//! - `StreamReader`: Sends one request and assembles the streamed answer
//! - `ChatClient`: Signs, connects and drives the reader for one call

pub mod chat_client;
pub mod error;
pub mod stream_reader;

#[cfg(test)]
pub(crate) mod fakes;

pub use chat_client::ChatClient;
pub use error::{ChatError, ChatFailure, TimeoutCause};
pub use stream_reader::StreamReader;
