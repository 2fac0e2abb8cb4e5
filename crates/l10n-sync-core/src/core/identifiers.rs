// crates/l10n-sync-core/src/core/identifiers.rs
// ============================================================================
// Module: L10n Sync Identifiers
// Description: Canonical opaque identifiers for runs, locales, plugins, and backend records.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: rand, serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout L10n Sync. Identifiers
//! are opaque strings on the wire; no normalization is applied beyond what each
//! type documents. Run identifiers are generated by the orchestrator, every
//! other identifier originates from configuration or from the backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Pipeline run identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; generated identifiers are unique per process with
///   overwhelming probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Creates a new run identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh run identifier from the wall clock and a random suffix.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Timestamp::now().as_unix_millis();
        let suffix: u32 = rand::thread_rng().gen_range(0 ..= 0xffff);
        Self(format!("run-{millis}-{suffix:04x}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Canonical locale code (for example `it` or `nb`).
///
/// # Invariants
/// - Opaque UTF-8 string; the backend-specific spelling lives on
///   [`crate::SupportedLocale`], never here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Creates a new locale code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for LocaleCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LocaleCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Plugin name as declared by its manifest or registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    /// Creates a new plugin name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PluginName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PluginName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier assigned by the translation backend to a key or a translation.
///
/// # Invariants
/// - Opaque; numeric backend ids are carried in their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    /// Creates a new backend identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for BackendId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}
