//! Client Configuration Settings
//!
//! Configuration types for the Spark chat client, loaded from environment
//! variables once at startup and shared read-only afterwards.

use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::conversation::ChatParameters;

/// Default chat endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://spark-api.xf-yun.com/v1.1/chat";

/// Default Origin header value.
pub const DEFAULT_ORIGIN: &str = "http://spark-api.xf-yun.com";

/// Spark API credentials.
#[derive(Clone)]
pub struct Credentials {
    app_id: String,
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Get the application id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Receive loop bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Overall deadline for the receive loop (`None` = unbounded).
    pub deadline: Option<Duration>,
    /// Maximum frames accepted per call (`None` = unbounded).
    pub max_frames: Option<usize>,
    /// Treat end-of-stream without a last-frame marker as an error.
    pub require_last_frame: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            deadline: Some(Duration::from_secs(60)),
            max_frames: Some(4096),
            require_last_frame: false,
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Chat endpoint URL.
    pub endpoint: String,
    /// Origin header sent with the handshake.
    pub origin: String,
    /// Chat generation parameters.
    pub chat: ChatParameters,
    /// Receive loop bounds.
    pub stream: StreamSettings,
    /// WebSocket handshake timeout.
    pub connect_timeout: Duration,
    /// Shift applied to the signing timestamp.
    pub clock_offset: TimeDelta,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            chat: ChatParameters::default(),
            stream: StreamSettings::default(),
            connect_timeout: Duration::from_secs(10),
            clock_offset: TimeDelta::zero(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is missing or empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, ConfigError> {
            let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
            if value.is_empty() {
                return Err(ConfigError::EmptyValue(key.to_string()));
            }
            Ok(value)
        };

        let credentials = Credentials::new(
            required("SPARK_APP_ID")?,
            required("SPARK_API_KEY")?,
            required("SPARK_API_SECRET")?,
        );

        let defaults = Self::new(credentials);
        let chat_defaults = ChatParameters::default();
        let stream_defaults = StreamSettings::default();
        let parse = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let chat = ChatParameters {
            domain: parse("SPARK_DOMAIN").unwrap_or(chat_defaults.domain),
            random_threshold: parse_or(
                parse("SPARK_RANDOM_THRESHOLD"),
                chat_defaults.random_threshold,
            ),
            max_tokens: parse_or(parse("SPARK_MAX_TOKENS"), chat_defaults.max_tokens),
            auditing: parse("SPARK_AUDITING").unwrap_or(chat_defaults.auditing),
        };

        let stream = StreamSettings {
            deadline: parse_optional_limit(parse("SPARK_STREAM_DEADLINE_SECS"))
                .map_or(stream_defaults.deadline, |secs| secs.map(Duration::from_secs)),
            max_frames: parse_optional_limit(parse("SPARK_MAX_FRAMES"))
                .map_or(stream_defaults.max_frames, |frames| {
                    frames.and_then(|n| usize::try_from(n).ok())
                }),
            require_last_frame: parse("SPARK_REQUIRE_LAST_FRAME")
                .map_or(stream_defaults.require_last_frame, |v| parse_bool(&v)),
        };

        Ok(Self {
            endpoint: parse("SPARK_ENDPOINT").unwrap_or(defaults.endpoint),
            origin: parse("SPARK_ORIGIN").unwrap_or(defaults.origin),
            chat,
            stream,
            connect_timeout: parse("SPARK_CONNECT_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(defaults.connect_timeout, Duration::from_secs),
            clock_offset: parse("SPARK_CLOCK_OFFSET_SECS")
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(defaults.clock_offset),
            credentials: defaults.credentials,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parse a limit where `0` disables it.
///
/// Returns `None` when the value is unparseable so the caller keeps its default.
fn parse_optional_limit(value: Option<String>) -> Option<Option<u64>> {
    let n = value?.parse::<u64>().ok()?;
    Some((n > 0).then_some(n))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
