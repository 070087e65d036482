//! WebSocket Transport
//!
//! `tokio-tungstenite` adapter for the [`Connector`] and [`DuplexConnection`]
//! ports. Control frames are handled here so callers only ever see whole
//! text messages or end-of-stream.
//!
//! End-of-stream is reported for a server close frame, a clean stream end,
//! and a TCP reset without closing handshake (the Spark service sometimes
//! drops the socket right after the last frame).

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{Connector, DuplexConnection, TransportError};

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Connector
// =============================================================================

/// Opens WebSocket connections with an explicit Origin header.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WebSocketConnector {
    /// Create a connector with the given handshake timeout.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn open(&self, url: &str, origin: &str) -> Result<Self::Connection, TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let origin = HeaderValue::from_str(origin)
            .map_err(|e| TransportError::Connect(format!("invalid origin: {e}")))?;
        request.headers_mut().insert(ORIGIN, origin);

        let (stream, response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    TransportError::Connect(format!(
                        "handshake timed out after {}ms",
                        self.connect_timeout.as_millis()
                    ))
                })?
                .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(WebSocketConnection {
            stream,
            closed: false,
        })
    }
}

// =============================================================================
// Connection
// =============================================================================

/// An open WebSocket connection.
pub struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl std::fmt::Debug for WebSocketConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketConnection")
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

const fn is_end_of_stream(error: &WsError) -> bool {
    matches!(
        error,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

#[async_trait]
impl DuplexConnection for WebSocketConnection {
    async fn send_message(&mut self, message: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, TransportError> {
        if self.closed {
            return Ok(None);
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    return String::from_utf8(data.to_vec()).map(Some).map_err(|e| {
                        TransportError::Receive(format!("non-UTF8 binary message: {e}"))
                    });
                }
                Some(Ok(Message::Ping(data))) => {
                    self.stream
                        .send(Message::Pong(data))
                        .await
                        .map_err(|e| TransportError::Receive(e.to_string()))?;
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Server sent close frame");
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(e)) if is_end_of_stream(&e) => {
                    tracing::debug!(error = %e, "WebSocket stream ended");
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => {
                    self.closed = true;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_end_of_stream(&e) => Ok(()),
            Err(e) => Err(TransportError::Close(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_stream_classification() {
        assert!(is_end_of_stream(&WsError::ConnectionClosed));
        assert!(is_end_of_stream(&WsError::AlreadyClosed));
        assert!(is_end_of_stream(&WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake
        )));
        assert!(!is_end_of_stream(&WsError::Io(std::io::Error::other("boom"))));
    }

    #[tokio::test]
    async fn open_rejects_invalid_url() {
        let connector = WebSocketConnector::default();
        let result = connector.open("not a url", "http://origin").await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn open_rejects_invalid_origin() {
        let connector = WebSocketConnector::default();
        let result = connector
            .open("ws://127.0.0.1:1/chat", "bad\norigin")
            .await;
        assert!(matches!(result, Err(TransportError::Connect(msg)) if msg.contains("origin")));
    }
}
