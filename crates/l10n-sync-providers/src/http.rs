// crates/l10n-sync-providers/src/http.rs
// ============================================================================
// Module: HTTP Helpers
// Description: Shared HTTP client construction and failure classification.
// Purpose: Map transport and status failures onto retryable or fatal outcomes.
// Dependencies: l10n-sync-core, reqwest, time
// ============================================================================

//! ## Overview
//! Both network clients send requests through [`send`], which reads the body
//! under [`MAX_RESPONSE_BYTES`] and captures the rate-limit headers. Status
//! codes are classified once, here:
//! - `429` is rate limiting, honouring `Retry-After` or `X-RateLimit-Reset`.
//! - `408` and `5xx` are transient.
//! - Every other non-success status is fatal for the whole request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use l10n_sync_core::ProviderFailure;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum response body size accepted from a remote service.
pub const MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;
/// Reset values above this are Unix timestamps rather than second counts.
const EPOCH_THRESHOLD_SECS: u64 = 1_000_000_000;
/// Maximum characters of a response body quoted in failure messages.
const BODY_PREVIEW_CHARS: usize = 200;
/// User agent sent with every request.
const USER_AGENT: &str = concat!("l10n-sync/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Client construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientSetupError {
    /// Base URL could not be parsed.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
    /// HTTP client could not be built.
    #[error("http client build failed: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Builds an HTTP client with a whole-request timeout and redirects disabled.
///
/// # Errors
///
/// Returns [`ClientSetupError::Client`] when the TLS backend cannot initialise.
pub(crate) fn build_client(timeout_ms: u64) -> Result<Client, ClientSetupError> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .build()
        .map_err(|err| ClientSetupError::Client(err.to_string()))
}

/// Response captured under the body limit.
#[derive(Debug)]
pub(crate) struct HttpReply {
    /// HTTP status.
    pub(crate) status: StatusCode,
    /// Wait requested by the server, if any.
    pub(crate) retry_after: Option<Duration>,
    /// Response body.
    pub(crate) body: Vec<u8>,
}

impl HttpReply {
    /// Returns a failure for a non-success reply.
    pub(crate) fn failure(&self) -> ProviderFailure {
        classify_status(self.status.as_u16(), self.retry_after, &body_preview(&self.body))
    }
}

/// Sends a request and reads the reply.
///
/// # Errors
///
/// Returns [`ProviderFailure::Transient`] for timeouts, connection failures,
/// and interrupted bodies; [`ProviderFailure::Fatal`] for requests that could
/// not be built or bodies above the limit.
pub(crate) async fn send(request: RequestBuilder) -> Result<HttpReply, ProviderFailure> {
    let mut response = request.send().await.map_err(|err| transport_failure(&err))?;
    let status = response.status();
    let retry_after = parse_retry_after(response.headers(), OffsetDateTime::now_utc().unix_timestamp());
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| transport_failure(&err))? {
        if body.len().saturating_add(chunk.len()) > MAX_RESPONSE_BYTES {
            return Err(ProviderFailure::Fatal(format!("response exceeds {MAX_RESPONSE_BYTES} bytes")));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(HttpReply {
        status,
        retry_after,
        body,
    })
}

/// Classifies a transport error.
fn transport_failure(err: &reqwest::Error) -> ProviderFailure {
    if err.is_builder() {
        ProviderFailure::Fatal(format!("request build failed: {err}"))
    } else {
        ProviderFailure::Transient(format!("transport error: {err}"))
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a non-success HTTP status.
#[must_use]
pub fn classify_status(status: u16, retry_after: Option<Duration>, detail: &str) -> ProviderFailure {
    let message = if detail.is_empty() { format!("http status {status}") } else { format!("http status {status}: {detail}") };
    match status {
        429 => ProviderFailure::RateLimited {
            retry_after,
            message,
        },
        408 | 500 ..= 599 => ProviderFailure::Transient(message),
        _ => ProviderFailure::Fatal(message),
    }
}

/// Reads the server-requested wait from `Retry-After` or `X-RateLimit-Reset`.
///
/// Both headers accept a second count; `X-RateLimit-Reset` may also carry a
/// Unix timestamp, measured against `now_unix`.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap, now_unix: i64) -> Option<Duration> {
    let seconds = |name: &str| -> Option<u64> { headers.get(name)?.to_str().ok()?.trim().parse::<u64>().ok() };
    if let Some(value) = seconds("retry-after") {
        return Some(Duration::from_secs(value));
    }
    let reset = seconds("x-ratelimit-reset")?;
    if reset < EPOCH_THRESHOLD_SECS {
        return Some(Duration::from_secs(reset));
    }
    let now = u64::try_from(now_unix).unwrap_or(0);
    Some(Duration::from_secs(reset.saturating_sub(now)))
}

/// Returns a trimmed, bounded preview of a response body.
pub(crate) fn body_preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body).trim().chars().take(BODY_PREVIEW_CHARS).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
