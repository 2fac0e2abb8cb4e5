// crates/l10n-sync-core/tests/gateway.rs
// ============================================================================
// Module: Gateway Tests
// Description: Tests for retry bounds, backoff, and per-lane cool-down windows.
// ============================================================================
//! ## Overview
//! Uses a paused tokio clock so backoff and cool-down waits are deterministic.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use l10n_sync_core::PipelineErrorKind;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::runtime::Gateway;
use l10n_sync_core::runtime::GatewayError;
use l10n_sync_core::runtime::Lane;
use l10n_sync_core::runtime::RetryPolicy;
use tokio::time::Instant;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_secs(1),
        max_delay: Duration::from_secs(8),
        jitter: false,
    }
}

/// Operation failing with `failure` for the first `failures` attempts.
async fn scripted(attempts: &AtomicU32, failures: u32, failure: ProviderFailure) -> Result<u32, ProviderFailure> {
    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= failures { Err(failure) } else { Ok(attempt) }
}

// ============================================================================
// SECTION: Retry Bounds
// ============================================================================

#[tokio::test(start_paused = true)]
async fn transient_failures_stop_after_max_retries() {
    let gateway = Gateway::new(policy(3));
    let attempts = AtomicU32::new(0);
    let started = Instant::now();
    let result = gateway
        .call(Lane::Backend, || scripted(&attempts, u32::MAX, ProviderFailure::Transient("503".to_string())))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), PipelineErrorKind::Transient);
    assert_eq!(err.attempts(), 4);
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(gateway.request_count(Lane::Backend), 4);
    assert_eq!(started.elapsed(), Duration::from_secs(1 + 2 + 4));
}

#[tokio::test(start_paused = true)]
async fn recovers_when_a_retry_succeeds() {
    let gateway = Gateway::new(policy(5));
    let attempts = AtomicU32::new(0);
    let value = gateway
        .call(Lane::Translation, || scripted(&attempts, 2, ProviderFailure::Transient("reset".to_string())))
        .await
        .unwrap();
    assert_eq!(value, 3);
    assert_eq!(gateway.request_count(Lane::Translation), 3);
    assert_eq!(gateway.request_count(Lane::Backend), 0);
}

#[tokio::test(start_paused = true)]
async fn fatal_failures_are_not_retried() {
    let gateway = Gateway::new(policy(5));
    let attempts = AtomicU32::new(0);
    let err = gateway
        .call(Lane::Backend, || scripted(&attempts, u32::MAX, ProviderFailure::Fatal("401".to_string())))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Fatal {
            attempts: 1,
            message: "401".to_string(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limits_surface_as_rate_limited() {
    let gateway = Gateway::new(policy(2));
    let attempts = AtomicU32::new(0);
    let failure = ProviderFailure::RateLimited {
        retry_after: None,
        message: "429".to_string(),
    };
    let err = gateway.call(Lane::Backend, || scripted(&attempts, u32::MAX, failure.clone())).await.unwrap_err();
    assert_eq!(err.kind(), PipelineErrorKind::RateLimited);
    assert_eq!(err.attempts(), 3);
}

// ============================================================================
// SECTION: Cool-Down Windows
// ============================================================================

#[tokio::test(start_paused = true)]
async fn retry_after_is_honoured() {
    let gateway = Gateway::new(policy(3));
    let attempts = AtomicU32::new(0);
    let failure = ProviderFailure::RateLimited {
        retry_after: Some(Duration::from_secs(6)),
        message: "429".to_string(),
    };
    let started = Instant::now();
    gateway.call(Lane::Backend, || scripted(&attempts, 1, failure.clone())).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert!(gateway.cooldown_remaining(Lane::Backend).is_none());
}

#[tokio::test(start_paused = true)]
async fn retry_after_is_capped_at_max_delay() {
    let gateway = Gateway::new(policy(3));
    let attempts = AtomicU32::new(0);
    let failure = ProviderFailure::RateLimited {
        retry_after: Some(Duration::from_secs(3600)),
        message: "429".to_string(),
    };
    let started = Instant::now();
    gateway.call(Lane::Backend, || scripted(&attempts, 1, failure.clone())).await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(8));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn cooldown_on_one_lane_does_not_delay_the_other() {
    let gateway = Arc::new(Gateway::new(policy(3)));
    let backend_attempts = Arc::new(AtomicU32::new(0));

    let throttled = {
        let gateway = Arc::clone(&gateway);
        let attempts = Arc::clone(&backend_attempts);
        tokio::spawn(async move {
            let failure = ProviderFailure::RateLimited {
                retry_after: Some(Duration::from_secs(10)),
                message: "429".to_string(),
            };
            gateway.call(Lane::Backend, || scripted(&attempts, 1, failure.clone())).await
        })
    };
    while backend_attempts.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(gateway.cooldown_remaining(Lane::Backend).is_some());
    assert!(gateway.cooldown_remaining(Lane::Translation).is_none());

    let started = Instant::now();
    let translation_attempts = AtomicU32::new(0);
    gateway
        .call(Lane::Translation, || scripted(&translation_attempts, 0, ProviderFailure::Transient(String::new())))
        .await
        .unwrap();
    assert_eq!(started.elapsed(), Duration::ZERO);

    assert_eq!(throttled.await.unwrap().unwrap(), 2);
}

// ============================================================================
// SECTION: Backoff
// ============================================================================

#[test]
fn backoff_grows_exponentially_and_caps() {
    let policy = policy(10);
    let delays: Vec<u64> = (0 .. 6).map(|attempt| policy.backoff(attempt).as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
}

#[test]
fn jittered_backoff_stays_between_half_and_cap() {
    let policy = RetryPolicy {
        jitter: true,
        ..policy(10)
    };
    for attempt in 0 .. 40 {
        let capped = Duration::from_secs(1u64 << attempt.min(3));
        let delay = policy.backoff(attempt);
        assert!(delay <= capped, "attempt {attempt}: {delay:?} above {capped:?}");
        assert!(delay >= capped / 2, "attempt {attempt}: {delay:?} below half of {capped:?}");
    }
}
