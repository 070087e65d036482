//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Spark adapters (request signing, frame codec, WebSocket transport).
pub mod spark;

/// Configuration loading.
pub mod config;

/// Tracing subscriber setup.
pub mod telemetry;
