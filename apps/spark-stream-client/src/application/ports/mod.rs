//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `Connector`: Opens a duplex connection to a signed URL
//! - `DuplexConnection`: Sends and receives whole messages
//! - `Clock`: Source of the signing timestamp

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Transport-level errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Receiving a message failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// Closing the connection failed.
    #[error("close failed: {0}")]
    Close(String),
}

/// A message-oriented, full-duplex connection.
#[async_trait]
pub trait DuplexConnection: Send {
    /// Send one text message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Send` if the message could not be delivered.
    async fn send_message(&mut self, message: String) -> Result<(), TransportError>;

    /// Wait for the next text message.
    ///
    /// Returns `Ok(None)` when the peer ended the stream.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Receive` on any other transport failure.
    async fn receive_message(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the connection. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Close` if the close handshake failed.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens duplex connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced by this connector.
    type Connection: DuplexConnection;

    /// Open a connection to `url`, presenting `origin` as the Origin header.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if the connection cannot be opened.
    async fn open(&self, url: &str, origin: &str) -> Result<Self::Connection, TransportError>;
}

/// Source of the current time for request signing.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
