// crates/l10n-sync-core/src/runtime/cost.rs
// ============================================================================
// Module: L10n Sync Cost Estimator
// Description: Token and price projection for a translation batch.
// Purpose: Surface the expected spend before any provider call is made.
// Dependencies: bigdecimal, thiserror, crate::core
// ============================================================================

//! ## Overview
//! The estimator is deterministic: the token count comes from a
//! [`TokenCounter`], prices from a [`PriceTable`], and no network call is made.
//! Only `Missing` entries are counted because only they reach the provider.
//! The orchestrator reports the estimate; it never blocks on it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::core::TranslationEntry;
use crate::core::TranslationStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Decimal places kept in cost results.
const COST_SCALE: i64 = 6;

/// Tokens per million, the unit prices are quoted in.
const TOKENS_PER_PRICE_UNIT: u64 = 1_000_000;

/// Built-in per-million prices (input, output) in USD.
const BUILTIN_PRICES: &[(&str, &str, &str)] = &[
    ("gpt-4o-mini", "0.15", "0.60"),
    ("gpt-4o", "2.50", "10.00"),
    ("gpt-4.1-mini", "0.40", "1.60"),
];

/// Default per-entry prompt overhead in tokens.
const DEFAULT_PROMPT_OVERHEAD_TOKENS: u64 = 12;

/// Default output size as a percentage of input size.
const DEFAULT_OUTPUT_RATIO_PERCENT: u64 = 120;

// ============================================================================
// SECTION: Token Counting
// ============================================================================

/// Deterministic token counter.
pub trait TokenCounter: Send + Sync {
    /// Returns the token count for `text`.
    fn count(&self, text: &str) -> u64;
}

/// Counts one token per `chars_per_token` characters, rounding up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRatioCounter {
    /// Characters per token (never zero).
    chars_per_token: u64,
}

impl CharRatioCounter {
    /// Creates a counter; a zero ratio is treated as one.
    #[must_use]
    pub const fn new(chars_per_token: u64) -> Self {
        Self {
            chars_per_token: if chars_per_token == 0 { 1 } else { chars_per_token },
        }
    }
}

impl Default for CharRatioCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for CharRatioCounter {
    fn count(&self, text: &str) -> u64 {
        let chars = u64::try_from(text.chars().count()).unwrap_or(u64::MAX);
        chars.div_ceil(self.chars_per_token)
    }
}

// ============================================================================
// SECTION: Pricing
// ============================================================================

/// Pricing and sizing assumptions for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    /// Model name.
    pub name: String,
    /// USD per million input tokens.
    pub input_per_million: BigDecimal,
    /// USD per million output tokens.
    pub output_per_million: BigDecimal,
    /// Prompt tokens added per entry.
    pub prompt_overhead_tokens: u64,
    /// Output tokens as a percentage of source tokens.
    pub output_ratio_percent: u64,
}

impl ModelProfile {
    /// Creates a profile with default overhead and output ratio.
    #[must_use]
    pub fn new(name: impl Into<String>, input_per_million: BigDecimal, output_per_million: BigDecimal) -> Self {
        Self {
            name: name.into(),
            input_per_million,
            output_per_million,
            prompt_overhead_tokens: DEFAULT_PROMPT_OVERHEAD_TOKENS,
            output_ratio_percent: DEFAULT_OUTPUT_RATIO_PERCENT,
        }
    }
}

/// Cost estimator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    /// No price is known for the model.
    #[error("no price configured for model {0}")]
    UnknownModel(String),
    /// A configured price is not a valid decimal.
    #[error("invalid price for model {model}: {value}")]
    InvalidPrice {
        /// Model name.
        model: String,
        /// Rejected value.
        value: String,
    },
}

/// Model prices by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    /// Profiles keyed by model name.
    models: BTreeMap<String, ModelProfile>,
}

impl PriceTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Creates a table with the built-in model prices.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (name, input, output) in BUILTIN_PRICES {
            if let (Ok(input), Ok(output)) = (BigDecimal::from_str(input), BigDecimal::from_str(output)) {
                table.insert(ModelProfile::new(*name, input, output));
            }
        }
        table
    }

    /// Adds or replaces a model profile.
    pub fn insert(&mut self, profile: ModelProfile) {
        self.models.insert(profile.name.clone(), profile);
    }

    /// Adds or replaces a model from decimal price strings.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::InvalidPrice`] when a price does not parse.
    pub fn insert_prices(&mut self, name: &str, input: &str, output: &str) -> Result<(), CostError> {
        let parse = |value: &str| {
            BigDecimal::from_str(value.trim()).map_err(|_| CostError::InvalidPrice {
                model: name.to_string(),
                value: value.to_string(),
            })
        };
        self.insert(ModelProfile::new(name, parse(input)?, parse(output)?));
        Ok(())
    }

    /// Returns the profile for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::UnknownModel`] when the model is not priced.
    pub fn profile(&self, name: &str) -> Result<&ModelProfile, CostError> {
        self.models.get(name).ok_or_else(|| CostError::UnknownModel(name.to_string()))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// SECTION: Estimation
// ============================================================================

/// Projected token usage and cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostEstimate {
    /// Model the estimate was computed for.
    pub model: String,
    /// Entries counted.
    pub entries: usize,
    /// Projected input tokens.
    pub input_tokens: u64,
    /// Projected output tokens.
    pub output_tokens: u64,
    /// Projected total tokens.
    pub tokens: u64,
    /// Projected cost in USD, rounded to six decimal places.
    pub cost: BigDecimal,
}

impl CostEstimate {
    /// Returns true when the cost is above `threshold`.
    #[must_use]
    pub fn exceeds(&self, threshold: Option<&BigDecimal>) -> bool {
        threshold.is_some_and(|limit| &self.cost > limit)
    }
}

/// Estimates tokens and cost for translating the `Missing` entries.
#[must_use]
pub fn estimate(entries: &[TranslationEntry], profile: &ModelProfile, counter: &dyn TokenCounter) -> CostEstimate {
    let mut counted = 0usize;
    let mut input_tokens = 0u64;
    let mut output_tokens = 0u64;
    for entry in entries.iter().filter(|entry| entry.status == TranslationStatus::Missing) {
        let source = counter.count(&entry.key.base_value);
        counted += 1;
        input_tokens = input_tokens.saturating_add(source.saturating_add(profile.prompt_overhead_tokens));
        output_tokens =
            output_tokens.saturating_add(source.saturating_mul(profile.output_ratio_percent).div_ceil(100));
    }
    let per_unit = BigDecimal::from(TOKENS_PER_PRICE_UNIT);
    let raw = (BigDecimal::from(input_tokens) * &profile.input_per_million
        + BigDecimal::from(output_tokens) * &profile.output_per_million)
        / per_unit;
    CostEstimate {
        model: profile.name.clone(),
        entries: counted,
        input_tokens,
        output_tokens,
        tokens: input_tokens.saturating_add(output_tokens),
        cost: raw.round(COST_SCALE),
    }
}
