// crates/l10n-sync-core/src/runtime/gateway.rs
// ============================================================================
// Module: L10n Sync Rate-Limited Gateway
// Description: Retry, backoff, and per-provider rate-limit windows for downstream calls.
// Purpose: Absorb transient downstream failures and classify the ones that persist.
// Dependencies: rand, thiserror, tokio, tracing, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Every backend and translation-provider call goes through [`Gateway::call`].
//! Rate-limit and transient failures are retried with exponential backoff and
//! jitter, at most [`RetryPolicy::max_retries`] times; fatal failures are
//! returned at once. A rate-limit signal opens a cool-down window on that
//! provider's lane: until it closes, requests on the lane are serialized and
//! wait for the window to end. Lanes are independent, so a throttled backend
//! never delays translation requests and vice versa.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::core::PipelineErrorKind;
use crate::interfaces::ProviderFailure;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Downstream provider lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Translation-management backend.
    Backend,
    /// Machine-translation provider.
    Translation,
}

impl Lane {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Translation => "translation",
        }
    }
}

/// Retry policy shared by both lanes.
///
/// # Invariants
/// - A call makes at most `max_retries + 1` attempts.
/// - Computed delays never exceed `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any computed delay.
    pub max_delay: Duration,
    /// Randomize delays between half and all of the computed value.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay after the given zero-based failed attempt.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = duration_millis(self.base_delay);
        let max_ms = duration_millis(self.max_delay);
        let factor = 1u64.checked_shl(attempt.min(16)).unwrap_or(u64::MAX);
        let capped = base_ms.saturating_mul(factor).min(max_ms);
        if !self.jitter || capped < 2 {
            return Duration::from_millis(capped);
        }
        let half = capped / 2;
        let spread = rand::thread_rng().gen_range(0 ..= half);
        Duration::from_millis(half + spread)
    }
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure surfaced after the retry policy gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The provider kept rate limiting past the retry bound.
    #[error("rate limited after {attempts} attempts: {message}")]
    RateLimited {
        /// Attempts made.
        attempts: u32,
        /// Last provider detail.
        message: String,
    },
    /// The provider kept failing transiently past the retry bound.
    #[error("transient failure after {attempts} attempts: {message}")]
    Transient {
        /// Attempts made.
        attempts: u32,
        /// Last provider detail.
        message: String,
    },
    /// The provider reported a non-retryable failure.
    #[error("fatal failure: {message}")]
    Fatal {
        /// Attempts made.
        attempts: u32,
        /// Provider detail.
        message: String,
    },
}

impl GatewayError {
    /// Returns the pipeline classification for this failure.
    #[must_use]
    pub const fn kind(&self) -> PipelineErrorKind {
        match self {
            Self::RateLimited { .. } => PipelineErrorKind::RateLimited,
            Self::Transient { .. } => PipelineErrorKind::Transient,
            Self::Fatal { .. } => PipelineErrorKind::Fatal,
        }
    }

    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::RateLimited { attempts, .. }
            | Self::Transient { attempts, .. }
            | Self::Fatal { attempts, .. } => *attempts,
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Per-lane mutable state.
#[derive(Debug, Default)]
struct LaneState {
    /// Requests issued on this lane.
    requests: AtomicU64,
    /// End of the active cool-down window, in milliseconds since the gateway epoch.
    cooldown_until_ms: AtomicU64,
    /// Serializes requests while a cool-down window is active.
    serial: Mutex<()>,
}

/// Rate-limited gateway for downstream calls.
///
/// # Invariants
/// - Request counters are only incremented, once per attempt.
/// - Cool-down windows only grow while active.
#[derive(Debug)]
pub struct Gateway {
    /// Retry policy.
    policy: RetryPolicy,
    /// Reference point for cool-down deadlines.
    epoch: Instant,
    /// Backend lane.
    backend: LaneState,
    /// Translation lane.
    translation: LaneState,
}

impl Gateway {
    /// Creates a gateway with the given retry policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            epoch: Instant::now(),
            backend: LaneState::default(),
            translation: LaneState::default(),
        }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Returns the number of requests issued on `lane`.
    #[must_use]
    pub fn request_count(&self, lane: Lane) -> u64 {
        self.lane(lane).requests.load(Ordering::Relaxed)
    }

    /// Returns the remaining cool-down on `lane`, if a window is active.
    #[must_use]
    pub fn cooldown_remaining(&self, lane: Lane) -> Option<Duration> {
        let until = self.lane(lane).cooldown_until_ms.load(Ordering::Acquire);
        let now = self.now_ms();
        (until > now).then(|| Duration::from_millis(until - now))
    }

    /// Runs `operation` under the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the operation fails fatally or keeps
    /// failing after the last allowed retry.
    pub async fn call<T, F, Fut>(&self, lane: Lane, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderFailure>>,
    {
        let state = self.lane(lane);
        let mut attempt: u32 = 0;
        loop {
            let serial = if self.cooldown_remaining(lane).is_some() {
                Some(state.serial.lock().await)
            } else {
                None
            };
            if let Some(wait) = self.cooldown_remaining(lane) {
                tokio::time::sleep(wait).await;
            }
            state.requests.fetch_add(1, Ordering::Relaxed);
            let result = operation().await;
            drop(serial);

            let failure = match result {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };
            let attempts = attempt + 1;
            match failure {
                ProviderFailure::Fatal(message) => {
                    return Err(GatewayError::Fatal {
                        attempts,
                        message,
                    });
                }
                ProviderFailure::RateLimited {
                    retry_after,
                    message,
                } => {
                    if attempt >= self.policy.max_retries {
                        return Err(GatewayError::RateLimited {
                            attempts,
                            message,
                        });
                    }
                    let delay = retry_after
                        .map_or_else(|| self.policy.backoff(attempt), |wait| wait.min(self.policy.max_delay));
                    self.extend_cooldown(state, delay);
                    warn!(
                        lane = lane.as_str(),
                        attempt = attempts,
                        delay_ms = duration_millis(delay),
                        "rate limited; cooling down lane"
                    );
                }
                ProviderFailure::Transient(message) => {
                    if attempt >= self.policy.max_retries {
                        return Err(GatewayError::Transient {
                            attempts,
                            message,
                        });
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        lane = lane.as_str(),
                        attempt = attempts,
                        delay_ms = duration_millis(delay),
                        error = %message,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
            attempt = attempts;
        }
    }

    /// Returns the state for `lane`.
    const fn lane(&self, lane: Lane) -> &LaneState {
        match lane {
            Lane::Backend => &self.backend,
            Lane::Translation => &self.translation,
        }
    }

    /// Milliseconds since the gateway epoch.
    fn now_ms(&self) -> u64 {
        duration_millis(self.epoch.elapsed())
    }

    /// Pushes the lane's cool-down deadline out to at least `now + delay`.
    fn extend_cooldown(&self, state: &LaneState, delay: Duration) {
        let until = self.now_ms().saturating_add(duration_millis(delay));
        state.cooldown_until_ms.fetch_max(until, Ordering::AcqRel);
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
