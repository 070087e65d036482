//! Spark WebSocket Adapters
//!
//! - **Signer**: HMAC-SHA256 signed connection URLs
//! - **Codec**: JSON request/frame encoding
//! - **WebSocket**: `tokio-tungstenite` transport

pub mod codec;
pub mod signer;
pub mod websocket;

pub use codec::{CodecError, FrameCodec};
pub use signer::{
    RequestSigner, SignedRequest, SignerError, build_signed_url, sign_request, signing_string,
};
pub use websocket::{WebSocketConnection, WebSocketConnector};
