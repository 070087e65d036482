#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Spark Stream Client - Signed WebSocket Chat Client
//!
//! Asks the Spark conversational service a single question over a
//! WebSocket connection and assembles the streamed answer.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Wire types and answer assembly
//!   - `conversation`: Outbound request and inbound frame types
//!   - `answer`: Frame-by-frame assembly state machine
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the transport and the signing clock
//!   - `services`: Stream reading and call orchestration
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `spark`: URL signer, frame codec, WebSocket transport
//!   - `config`: Configuration from environment
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//!                ┌──────────────┐  signed URL  ┌─────────────┐
//! credentials ──►│ RequestSigner│─────────────►│  Connector  │
//!                └──────────────┘              └──────┬──────┘
//!                                                     │ open
//!                ┌──────────────┐   frames     ┌──────▼──────┐
//! answer ◄───────│ StreamReader │◄─────────────│  Spark WS   │
//!                └──────────────┘   request ──►└─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Wire types and answer assembly with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::answer::{Answer, AnswerAssembler, AssemblyState, FrameOutcome};
pub use domain::conversation::{ChatFrame, ChatParameters, ChatRequest, TokenUsage};

// Ports
pub use application::ports::{
    Clock, Connector, DuplexConnection, FixedClock, SystemClock, TransportError,
};

// Services
pub use application::services::{ChatClient, ChatError, ChatFailure, StreamReader, TimeoutCause};

// Infrastructure config
pub use infrastructure::config::{ClientConfig, ConfigError, Credentials, StreamSettings};

// Spark adapters
pub use infrastructure::spark::{
    CodecError, FrameCodec, RequestSigner, SignedRequest, SignerError, WebSocketConnection,
    WebSocketConnector,
};

// Telemetry
pub use infrastructure::telemetry::{LogFormat, TelemetryConfig, init as init_telemetry};
