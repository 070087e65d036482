//! In-memory transport doubles for service tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{Connector, DuplexConnection, TransportError};

/// One scripted receive result.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a text message.
    Frame(String),
    /// Report end-of-stream.
    End,
    /// Fail the receive.
    ReceiveError,
    /// Never complete.
    Stall,
}

/// Build a success frame.
pub fn frame_json(content: &str, status: u8, total_tokens: Option<u32>) -> String {
    let mut payload = serde_json::json!({
        "choices": {
            "status": status,
            "seq": 0,
            "text": [{"content": content, "role": "assistant", "index": 0}]
        }
    });
    if let Some(total) = total_tokens {
        payload["usage"] = serde_json::json!({
            "text": {"question_tokens": 0, "prompt_tokens": 0,
                     "completion_tokens": total, "total_tokens": total}
        });
    }
    serde_json::json!({
        "header": {"code": 0, "message": "Success", "sid": "cht-test", "status": status},
        "payload": payload
    })
    .to_string()
}

/// Build an error frame.
pub fn error_json(code: i32, message: &str) -> String {
    serde_json::json!({
        "header": {"code": code, "message": message, "sid": "cht-test", "status": 2}
    })
    .to_string()
}

/// Connection replaying a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    steps: VecDeque<Step>,
    sent: Vec<String>,
    receives: usize,
    fail_send: bool,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnection {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            ..Self::default()
        }
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub const fn receives(&self) -> usize {
        self.receives
    }
}

#[async_trait]
impl DuplexConnection for ScriptedConnection {
    async fn send_message(&mut self, message: String) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        self.sent.push(message);
        Ok(())
    }

    async fn receive_message(&mut self) -> Result<Option<String>, TransportError> {
        self.receives += 1;
        match self.steps.pop_front() {
            Some(Step::Frame(text)) => Ok(Some(text)),
            Some(Step::End) | None => Ok(None),
            Some(Step::ReceiveError) => Err(TransportError::Receive("connection reset".to_string())),
            Some(Step::Stall) => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector handing out one scripted connection and recording calls.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    script: Mutex<Option<ScriptedConnection>>,
    opened: Mutex<Vec<(String, String)>>,
    closes: Arc<AtomicUsize>,
    refuse: bool,
}

impl ScriptedConnector {
    pub fn new(connection: ScriptedConnection) -> Self {
        let closes = Arc::clone(&connection.closes);
        Self {
            script: Mutex::new(Some(connection)),
            closes,
            ..Self::default()
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// `(url, origin)` of every open attempt.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().clone()
    }

    /// Number of `close` calls on handed-out connections.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn open(&self, url: &str, origin: &str) -> Result<Self::Connection, TransportError> {
        self.opened
            .lock()
            .push((url.to_string(), origin.to_string()));
        if self.refuse {
            return Err(TransportError::Connect("HTTP error: 401 Unauthorized".to_string()));
        }
        self.script
            .lock()
            .take()
            .ok_or_else(|| TransportError::Connect("script exhausted".to_string()))
    }
}
