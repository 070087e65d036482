//! Tracing Integration
//!
//! Installs a `tracing-subscriber` registry with an env filter and a
//! formatted output layer.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Filter directives (default adds `spark_stream_client=info`)
//! - `LOG_FORMAT`: `json` for structured output, anything else for pretty text
//!
//! # Usage
//!
//! ```ignore
//! use spark_stream_client::infrastructure::telemetry;
//!
//! telemetry::init();
//!
//! #[tracing::instrument]
//! fn handle_frame() {
//!     tracing::info!("Frame received");
//! }
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter directive for this crate.
const DEFAULT_DIRECTIVE: &str = "spark_stream_client=info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; unknown values fall back to pretty.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Output format.
    pub format: LogFormat,
    /// Directive added on top of `RUST_LOG`.
    pub default_directive: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_directive: DEFAULT_DIRECTIVE.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Self {
            format,
            ..Self::default()
        }
    }
}

/// Initialize tracing with configuration from environment.
pub fn init() {
    init_with_config(&TelemetryConfig::from_env());
}

/// Initialize tracing with custom configuration.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_config(config: &TelemetryConfig) {
    let mut env_filter = EnvFilter::from_default_env();
    match config.default_directive.parse() {
        Ok(directive) => env_filter = env_filter.add_directive(directive),
        Err(e) => eprintln!(
            "Ignoring invalid log directive '{}': {e}",
            config.default_directive
        ),
    }

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.default_directive, DEFAULT_DIRECTIVE);
    }

    #[test_case("json", LogFormat::Json)]
    #[test_case(" JSON ", LogFormat::Json)]
    #[test_case("pretty", LogFormat::Pretty)]
    #[test_case("", LogFormat::Pretty)]
    fn parses_log_format(value: &str, expected: LogFormat) {
        assert_eq!(LogFormat::parse(value), expected);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_with_config(&TelemetryConfig::default());
        init_with_config(&TelemetryConfig {
            format: LogFormat::Json,
            ..TelemetryConfig::default()
        });
    }
}
