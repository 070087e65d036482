//! Chat Client
//!
//! Composes signing, connecting and stream reading into a single call:
//!
//! ```text
//! ClientConfig ──► RequestSigner ──► signed URL ──► Connector::open
//!                                                        │
//!          answer ◄── StreamReader ◄── ChatRequest ◄─────┘
//! ```
//!
//! Every call signs a fresh URL and owns its connection; the connection is
//! closed on every exit path. Nothing is retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::{ChatError, ChatFailure};
use super::stream_reader::StreamReader;
use crate::application::ports::{Clock, Connector, DuplexConnection};
use crate::domain::answer::Answer;
use crate::domain::conversation::ChatRequest;
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::spark::{RequestSigner, WebSocketConnector};

/// Spark chat client.
///
/// Cheap to share behind an `Arc`; concurrent calls are independent.
#[derive(Debug)]
pub struct ChatClient<T = WebSocketConnector> {
    config: Arc<ClientConfig>,
    signer: RequestSigner,
    connector: T,
    cancel: CancellationToken,
}

impl ChatClient<WebSocketConnector> {
    /// Create a client using the WebSocket transport.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>) -> Self {
        let connector = WebSocketConnector::new(config.connect_timeout);
        Self::with_connector(config, connector)
    }
}

impl<T: Connector> ChatClient<T> {
    /// Create a client using a custom transport.
    #[must_use]
    pub fn with_connector(config: Arc<ClientConfig>, connector: T) -> Self {
        let signer = RequestSigner::new(config.credentials.clone(), config.endpoint.clone())
            .with_clock_offset(config.clock_offset);
        Self {
            config,
            signer,
            connector,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the signing clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.signer = self.signer.with_clock(clock);
        self
    }

    /// Abort in-flight and future calls when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts this client's calls.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Transport in use.
    #[must_use]
    pub const fn connector(&self) -> &T {
        &self.connector
    }

    /// Ask `message` on behalf of `username` and return the answer text.
    ///
    /// # Errors
    ///
    /// See [`ChatClient::ask`].
    pub async fn get_answer(&self, username: &str, message: &str) -> Result<String, ChatFailure> {
        self.ask(username, message).await.map(|answer| answer.text)
    }

    /// Ask `message` on behalf of `username` and return the full answer.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatFailure`] for a malformed endpoint, a failed connect,
    /// or any failure of the stream itself (with the partial answer).
    #[tracing::instrument(
        name = "chat",
        skip_all,
        fields(request_id = %Uuid::new_v4(), uid = %username)
    )]
    pub async fn ask(&self, username: &str, message: &str) -> Result<Answer, ChatFailure> {
        let signed = self.signer.sign().map_err(ChatError::from)?;

        tracing::info!(host = %signed.host, "Connecting to chat endpoint");
        let mut connection = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ChatError::Cancelled.into()),
            opened = self.connector.open(&signed.url, &self.config.origin) => {
                opened.map_err(|e| {
                    tracing::error!(error = %e, "Connect failed");
                    ChatError::ConnectFailed(e)
                })?
            }
        };

        let request = ChatRequest::new(
            self.config.credentials.app_id(),
            username,
            message,
            self.config.chat.clone(),
        );
        let reader =
            StreamReader::new(self.config.stream.clone()).with_cancellation(self.cancel.clone());

        let result = reader.run(&mut connection, &request).await;

        if let Err(e) = connection.close().await {
            tracing::debug!(error = %e, "Connection close failed");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use url::Url;

    use super::*;
    use crate::application::ports::FixedClock;
    use crate::application::services::fakes::{
        ScriptedConnection, ScriptedConnector, Step, error_json, frame_json,
    };
    use crate::infrastructure::config::Credentials;

    fn config() -> Arc<ClientConfig> {
        let mut config = ClientConfig::new(Credentials::new("app-1", "key", "secret"));
        config.stream.deadline = Some(Duration::from_secs(5));
        Arc::new(config)
    }

    fn client(connector: ScriptedConnector) -> ChatClient<ScriptedConnector> {
        let at = Utc.with_ymd_and_hms(2023, 5, 20, 8, 0, 0).unwrap();
        ChatClient::with_connector(config(), connector).with_clock(Arc::new(FixedClock(at)))
    }

    #[tokio::test]
    async fn get_answer_returns_assembled_text() {
        let connection = ScriptedConnection::new(vec![
            Step::Frame(frame_json("Hel", 0, None)),
            Step::Frame(frame_json("lo", 1, Some(0))),
            Step::Frame(frame_json("!", 2, Some(12))),
        ]);
        let client = client(ScriptedConnector::new(connection));

        let answer = tokio_test::assert_ok!(client.get_answer("alice", "greet me").await);

        assert_eq!(answer, "Hello!");
        assert_eq!(client.connector().closes(), 1);
    }

    #[tokio::test]
    async fn opens_signed_url_with_configured_origin() {
        let connection = ScriptedConnection::new(vec![Step::Frame(frame_json("x", 2, Some(1)))]);
        let client = client(ScriptedConnector::new(connection));
        client.ask("alice", "hi").await.unwrap();

        let opened = client.connector().opened();
        assert_eq!(opened.len(), 1);
        let (url, origin) = &opened[0];
        assert_eq!(origin, "http://spark-api.xf-yun.com");

        let url = Url::parse(url).unwrap();
        assert_eq!(url.host_str(), Some("spark-api.xf-yun.com"));
        assert_eq!(url.path(), "/v1.1/chat");
        let date = url
            .query_pairs()
            .find(|(k, _)| k == "date")
            .map(|(_, v)| v.into_owned());
        assert_eq!(date.as_deref(), Some("Sat, 20 May 2023 08:00:00 GMT"));
    }

    #[tokio::test]
    async fn connect_failure_is_reported() {
        let client = client(ScriptedConnector::refusing());

        let failure = client.get_answer("alice", "hi").await.unwrap_err();

        assert!(matches!(failure.error, ChatError::ConnectFailed(_)));
        assert_eq!(failure.partial_text(), "");
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_before_connecting() {
        let mut config = ClientConfig::new(Credentials::new("app", "key", "secret"));
        config.endpoint = "definitely not a url".to_string();
        let client = ChatClient::with_connector(Arc::new(config), ScriptedConnector::refusing());

        let failure = client.get_answer("alice", "hi").await.unwrap_err();

        assert!(matches!(failure.error, ChatError::InvalidEndpoint(_)));
        assert!(client.connector().opened().is_empty());
    }

    #[tokio::test]
    async fn connection_closed_after_service_error() {
        let connection = ScriptedConnection::new(vec![Step::Frame(error_json(10, "denied"))]);
        let client = client(ScriptedConnector::new(connection));

        let failure = client.ask("alice", "hi").await.unwrap_err();

        assert_eq!(failure.error.service_code(), Some(10));
        assert_eq!(client.connector().closes(), 1);
    }

    #[tokio::test]
    async fn connection_closed_after_receive_failure() {
        let connection = ScriptedConnection::new(vec![
            Step::Frame(frame_json("par", 0, None)),
            Step::ReceiveError,
        ]);
        let client = client(ScriptedConnector::new(connection));

        let failure = client.ask("alice", "hi").await.unwrap_err();

        assert!(matches!(failure.error, ChatError::ReceiveFailed(_)));
        assert_eq!(failure.partial_text(), "par");
        assert_eq!(client.connector().closes(), 1);
    }

    #[tokio::test]
    async fn cancelled_client_does_not_connect() {
        let client = client(ScriptedConnector::refusing());
        client.cancellation_token().cancel();

        let failure = client.ask("alice", "hi").await.unwrap_err();

        assert!(matches!(failure.error, ChatError::Cancelled));
        assert!(client.connector().opened().is_empty());
    }

    #[tokio::test]
    async fn cancellation_closes_stalled_connection() {
        let connection = ScriptedConnection::new(vec![Step::Stall]);
        let client = Arc::new(client(ScriptedConnector::new(connection)));
        let cancel = client.cancellation_token().clone();

        let call = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.ask("alice", "hi").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let failure = call.await.unwrap().unwrap_err();
        assert!(matches!(failure.error, ChatError::Cancelled));
        assert_eq!(client.connector().closes(), 1);
    }
}
