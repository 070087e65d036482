//! Spark Request Signing
//!
//! The Spark chat endpoint authenticates the WebSocket handshake through
//! three query parameters appended to the connection URL.
//!
//! # Signing Flow
//!
//! 1. Format the current time as an HTTP date (`Sat, 20 May 2023 08:00:00 GMT`)
//! 2. Build the signing string:
//!    ```text
//!    host: spark-api.xf-yun.com
//!    date: Sat, 20 May 2023 08:00:00 GMT
//!    GET /v1.1/chat HTTP/1.1
//!    ```
//! 3. `signature = base64(hmac_sha256(api_secret, signing_string))`
//! 4. `authorization = base64('api_key="..", algorithm="hmac-sha256",
//!    headers="host date request-line", signature=".."')`
//! 5. Append `authorization`, `date` and `host` as query parameters
//!
//! The server rejects dates outside its clock-skew window, so a signed URL
//! must be built fresh for every connection attempt.

use std::sync::Arc;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::{Url, form_urlencoded};

use crate::application::ports::{Clock, SystemClock};
use crate::infrastructure::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// HTTP date format used in the signing string and the `date` parameter.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Signature algorithm announced in the authorization value.
pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";

/// Signed header list announced in the authorization value.
pub const SIGNED_HEADERS: &str = "host date request-line";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while signing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The configured endpoint is not a usable WebSocket URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HMAC key was rejected. HMAC-SHA256 accepts keys of any length.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

// =============================================================================
// Signed Request
// =============================================================================

/// Output of a signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Connection URL with the authentication query appended.
    pub url: String,
    /// `host` parameter, port included when the endpoint names one.
    pub host: String,
    /// `date` parameter.
    pub date: String,
    /// `authorization` parameter, before URL escaping.
    pub authorization: String,
}

/// Host and path extracted from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EndpointParts {
    host: String,
    path: String,
}

fn parse_endpoint(endpoint: &str) -> Result<EndpointParts, SignerError> {
    let invalid = |reason: String| SignerError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid(format!("unsupported scheme: {}", url.scheme())));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing host".to_string()))?;

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(EndpointParts {
        host,
        path: url.path().to_string(),
    })
}

/// Format a timestamp as an HTTP date.
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Build the canonical signing string.
///
/// The request line is the last line and carries no trailing newline.
#[must_use]
pub fn signing_string(host: &str, date: &str, path: &str) -> String {
    format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1")
}

/// Compute `base64(hmac_sha256(secret, data))`.
///
/// # Errors
///
/// Returns `SignerError::InvalidKey` if the MAC rejects the key.
pub fn compute_signature(data: &str, secret: &str) -> Result<String, SignerError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the base64-encoded authorization value.
#[must_use]
pub fn authorization_value(api_key: &str, signature: &str) -> String {
    let origin = format!(
        r#"api_key="{api_key}", algorithm="{SIGNATURE_ALGORITHM}", headers="{SIGNED_HEADERS}", signature="{signature}""#
    );
    BASE64_STANDARD.encode(origin.as_bytes())
}

/// Sign `endpoint` for the instant `date_at`.
///
/// `date_at` is used as-is; apply any clock offset before calling.
///
/// # Errors
///
/// Returns `SignerError::InvalidEndpoint` if `endpoint` is not a `ws`/`wss`
/// URL with a host.
pub fn sign_request(
    credentials: &Credentials,
    endpoint: &str,
    date_at: DateTime<Utc>,
) -> Result<SignedRequest, SignerError> {
    let parts = parse_endpoint(endpoint)?;
    let date = http_date(date_at);

    let signature = compute_signature(
        &signing_string(&parts.host, &date, &parts.path),
        credentials.api_secret(),
    )?;
    let authorization = authorization_value(credentials.api_key(), &signature);

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("authorization", &authorization)
        .append_pair("date", &date)
        .append_pair("host", &parts.host)
        .finish();
    let separator = if endpoint.contains('?') { '&' } else { '?' };

    Ok(SignedRequest {
        url: format!("{endpoint}{separator}{query}"),
        host: parts.host,
        date,
        authorization,
    })
}

/// Build the signed connection URL for `endpoint` at `date_at`.
///
/// # Errors
///
/// Returns `SignerError::InvalidEndpoint` for a malformed endpoint.
pub fn build_signed_url(
    credentials: &Credentials,
    endpoint: &str,
    date_at: DateTime<Utc>,
) -> Result<String, SignerError> {
    sign_request(credentials, endpoint, date_at).map(|signed| signed.url)
}

// =============================================================================
// Request Signer
// =============================================================================

/// Signs connection URLs with the configured credentials and clock.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    endpoint: String,
    clock_offset: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl RequestSigner {
    /// Create a signer using the system clock and no offset.
    #[must_use]
    pub fn new(credentials: Credentials, endpoint: impl Into<String>) -> Self {
        Self {
            credentials,
            endpoint: endpoint.into(),
            clock_offset: TimeDelta::zero(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shift every signing timestamp by `offset`.
    #[must_use]
    pub fn with_clock_offset(mut self, offset: TimeDelta) -> Self {
        self.clock_offset = offset;
        self
    }

    /// Endpoint being signed.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sign a fresh connection URL.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::InvalidEndpoint` for a malformed endpoint.
    pub fn sign(&self) -> Result<SignedRequest, SignerError> {
        let date_at = self.clock.now() + self.clock_offset;
        let signed = sign_request(&self.credentials, &self.endpoint, date_at)?;
        tracing::debug!(host = %signed.host, date = %signed.date, "Signed connection URL");
        Ok(signed)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .field("clock_offset", &self.clock_offset)
            .finish_non_exhaustive()
    }
}
