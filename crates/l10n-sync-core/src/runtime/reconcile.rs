// crates/l10n-sync-core/src/runtime/reconcile.rs
// ============================================================================
// Module: L10n Sync Key Reconciliation
// Description: Missing and unused key computation from extraction and backend snapshots.
// Purpose: Provide a pure, order-independent reconciliation function.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Reconciliation compares the keys referenced by source code with the keys
//! and translations held by the backend. For every target locale and platform
//! the missing set is `extracted − backend keys with a non-empty value`; the
//! unused set is computed once, across platforms, per backend key.
//!
//! Membership is decided with sets, and output is sorted by identifier, then
//! locale, then platform, so permuting either input never changes the result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::BackendId;
use crate::core::BackendKeyRecord;
use crate::core::BackendSnapshot;
use crate::core::LocaleCode;
use crate::core::LocalizationKey;
use crate::core::Platform;
use crate::core::SupportedLocale;
use crate::core::TranslationEntry;
use crate::core::UnusedKeyCandidate;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Extracted keys per platform.
pub type ExtractedKeys = BTreeMap<Platform, BTreeSet<LocalizationKey>>;

/// Locale scope for a reconciliation pass.
///
/// # Invariants
/// - The base locale is the translation source and is never a target.
/// - Excluded locales are dropped before any comparison.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileScope<'a> {
    /// Configured supported locales.
    pub supported: &'a [SupportedLocale],
    /// Locales excluded from this project.
    pub excluded: &'a BTreeSet<LocaleCode>,
    /// Base (source) locale.
    pub base_locale: &'a LocaleCode,
}

impl ReconcileScope<'_> {
    /// Returns the locales that receive translations, in configured order.
    #[must_use]
    pub fn target_locales(&self) -> Vec<SupportedLocale> {
        let mut seen = BTreeSet::new();
        self.supported
            .iter()
            .filter(|locale| &locale.code != self.base_locale)
            .filter(|locale| !self.excluded.contains(&locale.code))
            .filter(|locale| seen.insert(locale.code.clone()))
            .cloned()
            .collect()
    }
}

/// Output of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Missing entries sorted by identifier, locale, platform.
    pub missing: Vec<TranslationEntry>,
    /// Unused backend keys sorted by identifier.
    pub unused: Vec<UnusedKeyCandidate>,
}

impl ReconciliationResult {
    /// Returns the missing entries for one locale.
    pub fn missing_for<'a>(
        &'a self,
        locale: &'a LocaleCode,
    ) -> impl Iterator<Item = &'a TranslationEntry> + 'a {
        self.missing.iter().filter(move |entry| &entry.locale == locale)
    }

    /// Returns the identifiers missing in one locale.
    #[must_use]
    pub fn missing_identifiers<'a>(&'a self, locale: &'a LocaleCode) -> BTreeSet<&'a str> {
        self.missing_for(locale).map(|entry| entry.key.identifier.as_str()).collect()
    }
}

// ============================================================================
// SECTION: Reconciliation
// ============================================================================

/// Computes missing entries and unused keys.
#[must_use]
pub fn reconcile(
    extracted: &ExtractedKeys,
    snapshot: &BackendSnapshot,
    scope: &ReconcileScope<'_>,
) -> ReconciliationResult {
    let mut missing = Vec::new();
    for locale in scope.target_locales() {
        for (platform, keys) in extracted {
            let translated = snapshot.translated_identifiers(&locale.code, *platform);
            for key in keys {
                if translated.contains(key.identifier.as_str()) {
                    continue;
                }
                let key = with_base_value(key, snapshot, scope.base_locale);
                let backend_id = snapshot.translation_id(&key.identifier, key.platform, &locale.code);
                missing.push(TranslationEntry::missing(key, locale.code.clone(), backend_id));
            }
        }
    }
    missing.sort_by_key(TranslationEntry::id);
    ReconciliationResult {
        missing,
        unused: unused_keys(extracted, snapshot, scope.base_locale),
    }
}

/// Computes backend keys that no platform references.
///
/// A backend key may carry a different name per platform; it is used when
/// any of its names is referenced by either platform. Each unused backend
/// key yields one candidate, named by its smallest identifier.
#[must_use]
pub fn unused_keys(
    extracted: &ExtractedKeys,
    snapshot: &BackendSnapshot,
    base_locale: &LocaleCode,
) -> Vec<UnusedKeyCandidate> {
    let referenced: BTreeSet<&str> =
        extracted.values().flatten().map(|key| key.identifier.as_str()).collect();
    let mut by_key: BTreeMap<&BackendId, Vec<(&str, &BackendKeyRecord)>> = BTreeMap::new();
    for (identifier, record) in &snapshot.keys {
        by_key.entry(&record.key_id).or_default().push((identifier.as_str(), record));
    }
    let mut unused: Vec<UnusedKeyCandidate> = by_key
        .into_iter()
        .filter(|(_, names)| names.iter().all(|(identifier, _)| !referenced.contains(identifier)))
        .filter_map(|(key_id, names)| {
            let (identifier, record) = names.into_iter().min_by_key(|(identifier, _)| *identifier)?;
            let platform = record.primary_platform();
            let base_value = snapshot.base_value(identifier, platform, base_locale).unwrap_or_default();
            Some(UnusedKeyCandidate {
                key: LocalizationKey::new(identifier, platform, base_value),
                backend_id: key_id.clone(),
            })
        })
        .collect();
    unused.sort_by(|left, right| left.key.identifier.cmp(&right.key.identifier));
    unused
}

/// Fills an empty extracted base value from the backend's base locale.
fn with_base_value(key: &LocalizationKey, snapshot: &BackendSnapshot, base: &LocaleCode) -> LocalizationKey {
    if !key.base_value.is_empty() {
        return key.clone();
    }
    let base_value = snapshot.base_value(&key.identifier, key.platform, base).unwrap_or_default();
    key.clone().with_base_value(base_value)
}
