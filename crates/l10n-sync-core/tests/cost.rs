// crates/l10n-sync-core/tests/cost.rs
// ============================================================================
// Module: Cost Estimator Tests
// Description: Tests for token counting, pricing lookups, and cost rounding.
// ============================================================================
//! ## Overview
//! Validates that estimates are deterministic, count only missing entries,
//! and price tokens with exact decimal arithmetic.

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

use std::str::FromStr;

use bigdecimal::BigDecimal;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationOrigin;
use l10n_sync_core::runtime::CharRatioCounter;
use l10n_sync_core::runtime::CostError;
use l10n_sync_core::runtime::ModelProfile;
use l10n_sync_core::runtime::PriceTable;
use l10n_sync_core::runtime::TokenCounter;
use l10n_sync_core::runtime::estimate;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

fn missing(identifier: &str, base: &str) -> TranslationEntry {
    TranslationEntry::missing(LocalizationKey::new(identifier, Platform::Ios, base), LocaleCode::new("de"), None)
}

fn decimal(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

// ============================================================================
// SECTION: Token Counting
// ============================================================================

#[test]
fn char_ratio_counter_rounds_up() {
    let counter = CharRatioCounter::default();
    assert_eq!(counter.count(""), 0);
    assert_eq!(counter.count("abc"), 1);
    assert_eq!(counter.count("abcd"), 1);
    assert_eq!(counter.count("abcde"), 2);
    assert_eq!(counter.count("äöüß"), 1);
    assert_eq!(CharRatioCounter::new(0).count("abc"), 3);
}

// ============================================================================
// SECTION: Pricing
// ============================================================================

#[test]
fn builtin_table_prices_known_models() {
    let table = PriceTable::builtin();
    let profile = table.profile("gpt-4o-mini").unwrap();
    assert_eq!(profile.input_per_million, decimal("0.15"));
    assert_eq!(profile.output_per_million, decimal("0.60"));
    assert_eq!(table.profile("unknown-model"), Err(CostError::UnknownModel("unknown-model".to_string())));
}

#[test]
fn invalid_prices_are_rejected() {
    let mut table = PriceTable::empty();
    assert!(matches!(table.insert_prices("custom", "abc", "1.0"), Err(CostError::InvalidPrice { .. })));
    table.insert_prices("custom", "1.0", " 2.0 ").unwrap();
    assert_eq!(table.profile("custom").unwrap().output_per_million, decimal("2.0"));
}

// ============================================================================
// SECTION: Estimation
// ============================================================================

#[test]
fn estimate_counts_only_missing_entries() {
    let profile = ModelProfile::new("flat", decimal("1"), decimal("2"));
    let mut done = missing("done", "Already translated text");
    done.mark_translated("Fertig", TranslationOrigin::Provider).unwrap();
    let entries = vec![missing("greeting", "Hello there!"), done];

    let estimate = estimate(&entries, &profile, &CharRatioCounter::default());
    assert_eq!(estimate.entries, 1);
    // "Hello there!" is 12 chars -> 3 tokens; input adds 12 overhead tokens.
    assert_eq!(estimate.input_tokens, 15);
    // 3 * 120% = 3.6 -> 4.
    assert_eq!(estimate.output_tokens, 4);
    assert_eq!(estimate.tokens, 19);
    // (15 * 1 + 4 * 2) / 1e6
    assert_eq!(estimate.cost, decimal("0.000023"));
}

#[test]
fn estimate_is_deterministic_and_rounded() {
    let table = PriceTable::builtin();
    let profile = table.profile("gpt-4o").unwrap();
    let entries: Vec<_> = (0 .. 50).map(|i| missing(&format!("key_{i}"), "Settings and preferences")).collect();
    let first = estimate(&entries, profile, &CharRatioCounter::default());
    let second = estimate(&entries, profile, &CharRatioCounter::default());
    assert_eq!(first, second);
    assert_eq!(first.cost.round(6), first.cost);
}

#[test]
fn warning_threshold_is_exclusive() {
    let profile = ModelProfile::new("flat", decimal("1000000"), decimal("0"));
    let estimate = estimate(&[missing("a", "")], &profile, &CharRatioCounter::default());
    assert_eq!(estimate.cost, decimal("12"));
    assert!(!estimate.exceeds(None));
    assert!(!estimate.exceeds(Some(&decimal("12"))));
    assert!(estimate.exceeds(Some(&decimal("11.99"))));
}
