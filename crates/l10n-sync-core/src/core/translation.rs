// crates/l10n-sync-core/src/core/translation.rs
// ============================================================================
// Module: L10n Sync Translation Model
// Description: Localization keys, locales, translation entries, and their lifecycle.
// Purpose: Define the records every stage reads and the only legal status transitions.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`LocalizationKey`] is identified by its identifier and platform; the base
//! value travels with it as payload. A [`TranslationEntry`] is one key in one
//! locale and moves through `Missing → Translated → Uploaded`, or to `Skipped`
//! before upload. Status never reverts: every mutation goes through
//! [`TranslationEntry::transition`], which rejects backward moves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::BackendId;
use crate::core::identifiers::LocaleCode;
use crate::core::identifiers::PluginName;

// ============================================================================
// SECTION: Platforms
// ============================================================================

/// Source platform a key was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Swift / Objective-C sources.
    Ios,
    /// Kotlin / Java sources and XML resources.
    Android,
}

impl Platform {
    /// All platforms in canonical order.
    pub const ALL: [Self; 2] = [Self::Ios, Self::Android];

    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// Parses a platform label, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Keys and Locales
// ============================================================================

/// Localization key referenced by source code.
///
/// # Invariants
/// - Equality, hashing, and ordering use `(identifier, platform)` only.
/// - `base_value` is payload and may be empty when the extractor has no text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationKey {
    /// Key identifier as written in source.
    pub identifier: String,
    /// Platform the key belongs to.
    pub platform: Platform,
    /// Base-locale text used as translation source.
    pub base_value: String,
}

impl LocalizationKey {
    /// Creates a key with the given base value.
    #[must_use]
    pub fn new(identifier: impl Into<String>, platform: Platform, base_value: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            platform,
            base_value: base_value.into(),
        }
    }

    /// Creates a key with no base value.
    #[must_use]
    pub fn bare(identifier: impl Into<String>, platform: Platform) -> Self {
        Self::new(identifier, platform, String::new())
    }

    /// Returns a copy of this key carrying a different base value.
    #[must_use]
    pub fn with_base_value(mut self, base_value: impl Into<String>) -> Self {
        self.base_value = base_value.into();
        self
    }
}

impl PartialEq for LocalizationKey {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.platform == other.platform
    }
}

impl Eq for LocalizationKey {}

impl Hash for LocalizationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.platform.hash(state);
    }
}

impl PartialOrd for LocalizationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LocalizationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identifier
            .cmp(&other.identifier)
            .then_with(|| self.platform.cmp(&other.platform))
    }
}

/// Locale the project is configured to support.
///
/// # Invariants
/// - `backend_code`, when set, is the spelling the backend uses for `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedLocale {
    /// Canonical locale code.
    pub code: LocaleCode,
    /// Human-readable language name used in translation prompts.
    pub name: String,
    /// Backend-specific locale code when it differs from `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_code: Option<String>,
}

impl SupportedLocale {
    /// Creates a supported locale without a backend mapping.
    #[must_use]
    pub fn new(code: impl Into<LocaleCode>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            backend_code: None,
        }
    }

    /// Returns this locale with an explicit backend mapping.
    #[must_use]
    pub fn with_backend_code(mut self, backend_code: impl Into<String>) -> Self {
        self.backend_code = Some(backend_code.into());
        self
    }

    /// Returns the code the backend uses for this locale.
    #[must_use]
    pub fn backend_code(&self) -> &str {
        self.backend_code.as_deref().unwrap_or_else(|| self.code.as_str())
    }
}

// ============================================================================
// SECTION: Translation Entries
// ============================================================================

/// Lifecycle status of a translation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// No usable value exists in the backend.
    Missing,
    /// A value was produced by the provider, a plugin, or a reviewer.
    Translated,
    /// The value was written to the backend.
    Uploaded,
    /// The entry was filtered out before upload.
    Skipped,
}

impl TranslationStatus {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Translated => "translated",
            Self::Uploaded => "uploaded",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a status label, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "missing" => Some(Self::Missing),
            "translated" => Some(Self::Translated),
            "uploaded" => Some(Self::Uploaded),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Returns true when moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Missing, Self::Missing | Self::Translated | Self::Skipped)
                | (Self::Translated, Self::Translated | Self::Uploaded | Self::Skipped)
                | (Self::Uploaded, Self::Uploaded)
                | (Self::Skipped, Self::Skipped)
        )
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a translated value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "plugin", rename_all = "snake_case")]
pub enum TranslationOrigin {
    /// Machine-translation provider.
    Provider,
    /// Action plugin bypass.
    Plugin(PluginName),
    /// Reviewer edit captured from the review report.
    Manual,
    /// Base value was empty; nothing was sent to the provider.
    EmptySource,
}

impl TranslationOrigin {
    /// Returns a compact label used in reports (`plugin:<name>` for plugins).
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Provider => "provider".to_string(),
            Self::Plugin(name) => format!("plugin:{name}"),
            Self::Manual => "manual".to_string(),
            Self::EmptySource => "empty_source".to_string(),
        }
    }

    /// Parses a label produced by [`TranslationOrigin::label`].
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if let Some(name) = label.strip_prefix("plugin:") {
            return Some(Self::Plugin(PluginName::new(name)));
        }
        match label {
            "provider" => Some(Self::Provider),
            "manual" => Some(Self::Manual),
            "empty_source" => Some(Self::EmptySource),
            _ => None,
        }
    }
}

/// Identity of a translation entry: one key in one locale.
///
/// # Invariants
/// - Field order defines the stable sort: identifier, then locale, then platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId {
    /// Key identifier.
    pub identifier: String,
    /// Target locale.
    pub locale: LocaleCode,
    /// Key platform.
    pub platform: Platform,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.identifier, self.platform, self.locale)
    }
}

/// Rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal status transition for {entry}: {from} -> {to}")]
pub struct StatusTransitionError {
    /// Entry whose transition was rejected.
    pub entry: EntryId,
    /// Status before the attempted change.
    pub from: TranslationStatus,
    /// Requested status.
    pub to: TranslationStatus,
}

/// One localization key in one target locale.
///
/// # Invariants
/// - `status` only changes through [`TranslationEntry::transition`].
/// - `backend_id` is the backend translation id used for upload; entries
///   without one cannot be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    /// Key being translated.
    pub key: LocalizationKey,
    /// Target locale.
    pub locale: LocaleCode,
    /// Current value, when any.
    pub value: Option<String>,
    /// Lifecycle status.
    pub status: TranslationStatus,
    /// Backend translation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<BackendId>,
    /// Source of the current value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<TranslationOrigin>,
}

impl TranslationEntry {
    /// Creates a `Missing` entry.
    #[must_use]
    pub const fn missing(key: LocalizationKey, locale: LocaleCode, backend_id: Option<BackendId>) -> Self {
        Self {
            key,
            locale,
            value: None,
            status: TranslationStatus::Missing,
            backend_id,
            origin: None,
        }
    }

    /// Returns the entry identity.
    #[must_use]
    pub fn id(&self) -> EntryId {
        EntryId {
            identifier: self.key.identifier.clone(),
            locale: self.locale.clone(),
            platform: self.key.platform,
        }
    }

    /// Returns true when the entry carries a non-empty value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|value| !value.trim().is_empty())
    }

    /// Returns true when the entry should be written to the backend.
    #[must_use]
    pub fn is_uploadable(&self) -> bool {
        self.status == TranslationStatus::Translated && self.has_value()
    }

    /// Moves the entry to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] when the move would revert the lifecycle.
    pub fn transition(&mut self, next: TranslationStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition(next) {
            return Err(StatusTransitionError {
                entry: self.id(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Records a translated value.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] when the entry was already uploaded or skipped.
    pub fn mark_translated(
        &mut self,
        value: impl Into<String>,
        origin: TranslationOrigin,
    ) -> Result<(), StatusTransitionError> {
        self.transition(TranslationStatus::Translated)?;
        self.value = Some(value.into());
        self.origin = Some(origin);
        Ok(())
    }

    /// Records a successful backend write.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] unless the entry is `Translated`.
    pub fn mark_uploaded(&mut self) -> Result<(), StatusTransitionError> {
        self.transition(TranslationStatus::Uploaded)
    }

    /// Filters the entry out of the upload.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] when the entry was already uploaded.
    pub fn mark_skipped(&mut self) -> Result<(), StatusTransitionError> {
        self.transition(TranslationStatus::Skipped)
    }
}

/// Backend key that no configured platform references anymore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedKeyCandidate {
    /// Key as known to the backend.
    pub key: LocalizationKey,
    /// Backend key identifier passed to delete.
    pub backend_id: BackendId,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
