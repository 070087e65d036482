//! Configuration Module
//!
//! Configuration loading for the chat client.

mod settings;

pub use settings::{
    ClientConfig, ConfigError, Credentials, DEFAULT_ENDPOINT, DEFAULT_ORIGIN, StreamSettings,
};
