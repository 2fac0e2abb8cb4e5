// crates/l10n-sync-core/src/core/snapshot.rs
// ============================================================================
// Module: L10n Sync Backend Snapshot
// Description: Point-in-time view of keys and translations held by the backend.
// Purpose: Give reconciliation a pure, order-independent input.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`BackendSnapshot`] is fetched once per reconciliation pass. It records
//! every backend key by identifier and, per canonical locale, the translation
//! entries the backend holds. Lookups resolve duplicates deterministically so
//! the order a backend returns records in never changes reconciliation output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::BackendId;
use crate::core::identifiers::LocaleCode;
use crate::core::translation::Platform;
use crate::core::translation::TranslationEntry;

// ============================================================================
// SECTION: Snapshot Types
// ============================================================================

/// Backend record for a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendKeyRecord {
    /// Backend key identifier.
    pub key_id: BackendId,
    /// Platforms the key is attached to.
    pub platforms: BTreeSet<Platform>,
}

impl BackendKeyRecord {
    /// Creates a key record.
    #[must_use]
    pub fn new(key_id: impl Into<BackendId>, platforms: impl IntoIterator<Item = Platform>) -> Self {
        Self {
            key_id: key_id.into(),
            platforms: platforms.into_iter().collect(),
        }
    }

    /// Returns the platform used when the key must be represented by one.
    #[must_use]
    pub fn primary_platform(&self) -> Platform {
        self.platforms.first().copied().unwrap_or(Platform::Ios)
    }
}

/// Keys and translations currently held by the backend.
///
/// # Invariants
/// - `entries` is keyed by canonical locale code, not the backend spelling.
/// - Entry order inside each locale carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSnapshot {
    /// Backend keys by identifier.
    pub keys: BTreeMap<String, BackendKeyRecord>,
    /// Backend translation entries by locale.
    pub entries: BTreeMap<LocaleCode, Vec<TranslationEntry>>,
}

impl BackendSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend key.
    pub fn insert_key(&mut self, identifier: impl Into<String>, record: BackendKeyRecord) {
        self.keys.insert(identifier.into(), record);
    }

    /// Adds a backend translation entry.
    pub fn insert_entry(&mut self, entry: TranslationEntry) {
        self.entries.entry(entry.locale.clone()).or_default().push(entry);
    }

    /// Returns the identifiers with a non-empty value for `locale` and `platform`.
    #[must_use]
    pub fn translated_identifiers(&self, locale: &LocaleCode, platform: Platform) -> BTreeSet<&str> {
        self.entries
            .get(locale)
            .into_iter()
            .flatten()
            .filter(|entry| entry.key.platform == platform && entry.has_value())
            .map(|entry| entry.key.identifier.as_str())
            .collect()
    }

    /// Returns the backend translation id for one key in one locale.
    ///
    /// When several records match, the smallest id wins.
    #[must_use]
    pub fn translation_id(
        &self,
        identifier: &str,
        platform: Platform,
        locale: &LocaleCode,
    ) -> Option<BackendId> {
        self.entries
            .get(locale)
            .into_iter()
            .flatten()
            .filter(|entry| entry.key.identifier == identifier && entry.key.platform == platform)
            .filter_map(|entry| entry.backend_id.clone())
            .min()
    }

    /// Returns the base-locale text for a key.
    ///
    /// Prefers the same platform, then any platform; ties resolve to the
    /// lexicographically smallest value.
    #[must_use]
    pub fn base_value(&self, identifier: &str, platform: Platform, base: &LocaleCode) -> Option<&str> {
        let candidates: Vec<&TranslationEntry> = self
            .entries
            .get(base)
            .into_iter()
            .flatten()
            .filter(|entry| entry.key.identifier == identifier && entry.has_value())
            .collect();
        let same_platform = candidates
            .iter()
            .filter(|entry| entry.key.platform == platform)
            .filter_map(|entry| entry.value.as_deref())
            .min();
        same_platform.or_else(|| candidates.iter().filter_map(|entry| entry.value.as_deref()).min())
    }
}
