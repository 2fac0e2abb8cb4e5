// crates/l10n-sync-core/src/interfaces/mod.rs
// ============================================================================
// Module: L10n Sync Interfaces
// Description: Capability interfaces for extraction, backend, translation, reports, and plugins.
// Purpose: Define the contract surfaces the orchestrator drives without knowing implementations.
// Dependencies: async-trait, serde, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how L10n Sync integrates with source trees, the
//! translation-management backend, the machine-translation provider, the
//! report store, and plugins. Network-facing collaborators classify their own
//! failures into [`ProviderFailure`] so the gateway can decide whether to
//! retry; everything else reports a typed error the orchestrator maps onto a
//! stage failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::BackendId;
use crate::core::BackendSnapshot;
use crate::core::EntryId;
use crate::core::LocaleCode;
use crate::core::LocalizationKey;
use crate::core::Platform;
use crate::core::PluginName;
use crate::core::RunId;
use crate::core::SupportedLocale;
use crate::core::TranslationEntry;

// ============================================================================
// SECTION: Source Extraction
// ============================================================================

/// Source extraction errors.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The configured source root does not exist or is not a directory.
    #[error("source root missing: {0}")]
    MissingRoot(String),
    /// A source file could not be read.
    #[error("source scan io error: {0}")]
    Io(String),
}

/// Scans a source tree for referenced localization keys.
pub trait Extractor: Send + Sync {
    /// Returns every key referenced under `root` for `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] when the tree cannot be scanned.
    fn scan(&self, root: &Path, platform: Platform) -> Result<BTreeSet<LocalizationKey>, ExtractionError>;
}

// ============================================================================
// SECTION: Downstream Failures
// ============================================================================

/// Failure reported by a network-facing collaborator.
///
/// # Invariants
/// - `RateLimited` and `Transient` are retryable; `Fatal` never is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    /// The provider asked the caller to slow down.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Provider-reported wait before the next request, when supplied.
        retry_after: Option<Duration>,
        /// Provider detail.
        message: String,
    },
    /// Network or server-side failure that may succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),
    /// Failure that will not succeed on retry (for example rejected credentials).
    #[error("fatal failure: {0}")]
    Fatal(String),
}

// ============================================================================
// SECTION: Translation Backend
// ============================================================================

/// Entry the backend refused to store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRejection {
    /// Rejected entry.
    pub entry: EntryId,
    /// Backend-supplied reason.
    pub reason: String,
}

/// Per-entry result of an upload batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Entries written to the backend.
    pub accepted: Vec<EntryId>,
    /// Entries the backend refused.
    pub rejected: Vec<UploadRejection>,
}

/// Translation-management backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Fetches keys and translations for the given locales.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderFailure`] when the backend cannot be read.
    async fn fetch_snapshot(
        &self,
        project_id: &str,
        locales: &[SupportedLocale],
    ) -> Result<BackendSnapshot, ProviderFailure>;

    /// Writes translated entries.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderFailure`] when the batch as a whole fails; per-entry
    /// refusals are reported through [`UploadOutcome::rejected`].
    async fn upload(
        &self,
        project_id: &str,
        entries: &[TranslationEntry],
    ) -> Result<UploadOutcome, ProviderFailure>;

    /// Deletes keys by backend key id.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderFailure`] when the deletion fails.
    async fn delete(&self, project_id: &str, key_ids: &[BackendId]) -> Result<(), ProviderFailure>;
}

// ============================================================================
// SECTION: Machine Translation
// ============================================================================

/// Keys to translate into one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationBatch {
    /// Target locale.
    pub locale: SupportedLocale,
    /// Keys with their base values.
    pub keys: Vec<LocalizationKey>,
}

/// Machine-translation provider.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translates a batch, returning values keyed by localization key.
    ///
    /// Keys absent from the result stay untranslated.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderFailure`] when the provider call fails.
    async fn translate(
        &self,
        batch: &TranslationBatch,
        prompt_addendum: &str,
    ) -> Result<BTreeMap<LocalizationKey, String>, ProviderFailure>;
}

// ============================================================================
// SECTION: Report Store
// ============================================================================

/// Report store errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report I/O failure.
    #[error("report io error: {0}")]
    Io(String),
    /// Report contents could not be interpreted.
    #[error("report invalid: {0}")]
    Invalid(String),
    /// Report is claimed by another owner.
    #[error("report locked: {0}")]
    Locked(String),
}

/// Tabular report persistence shared with human reviewers.
///
/// # Invariants
/// - `claim` and `release` bracket the windows in which the orchestrator owns
///   a report; outside them a human editor may change it.
pub trait ReportStore: Send + Sync {
    /// Writes (replaces) a report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the report cannot be written.
    fn write(&self, report: &str, entries: &[TranslationEntry]) -> Result<(), ReportError>;

    /// Reads a report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the report is missing or malformed.
    fn read(&self, report: &str) -> Result<Vec<TranslationEntry>, ReportError>;

    /// Returns true when the report exists.
    fn exists(&self, report: &str) -> bool;

    /// Takes exclusive ownership of a report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Locked`] when another owner holds the report.
    fn claim(&self, _report: &str) -> Result<(), ReportError> {
        Ok(())
    }

    /// Gives up ownership of a report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the claim cannot be released.
    fn release(&self, _report: &str) -> Result<(), ReportError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Plugins
// ============================================================================

/// Plugin extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    /// May bypass translation with its own values.
    Action,
    /// Contributes text to the translation prompt.
    Prompt,
    /// Filters or flags translated entries before review.
    Extension,
}

impl PluginKind {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Prompt => "prompt",
            Self::Extension => "extension",
        }
    }

    /// Parses a kind marker, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "action" => Some(Self::Action),
            "prompt" => Some(Self::Prompt),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry view of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name.
    pub name: PluginName,
    /// Extension point.
    pub kind: PluginKind,
    /// Whether the plugin participates in dispatch.
    pub enabled: bool,
}

/// Error raised by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Plugin configuration is invalid.
    #[error("plugin configuration invalid: {0}")]
    Invalid(String),
    /// Plugin failed while running.
    #[error("plugin failed: {0}")]
    Failed(String),
}

/// Input handed to action plugins.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// Active run.
    pub run_id: &'a RunId,
    /// Missing entries the translation stage would otherwise handle.
    pub entries: &'a [TranslationEntry],
}

/// Value an action plugin supplies for one key in one locale.
///
/// # Invariants
/// - `platform = None` applies the value to every platform of the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassValue {
    /// Key identifier.
    pub identifier: String,
    /// Target locale.
    pub locale: LocaleCode,
    /// Platform restriction.
    pub platform: Option<Platform>,
    /// Translated value.
    pub value: String,
}

impl BypassValue {
    /// Returns true when this value applies to `entry`.
    #[must_use]
    pub fn matches(&self, entry: &TranslationEntry) -> bool {
        self.identifier == entry.key.identifier
            && self.locale == entry.locale
            && self.platform.is_none_or(|platform| platform == entry.key.platform)
    }
}

/// Decision returned by an action plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Let the remaining plugins and the translation stage run.
    Continue,
    /// Skip translation for the whole key set, using these values.
    Bypass(Vec<BypassValue>),
}

/// Input handed to prompt plugins.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Active run.
    pub run_id: &'a RunId,
    /// Locales that will be translated.
    pub locales: &'a [SupportedLocale],
}

/// Plugin that may replace the translation stage.
pub trait ActionPlugin: Send + Sync {
    /// Decides whether to bypass translation.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin fails.
    fn run(&self, ctx: &ActionContext<'_>) -> Result<ActionOutcome, PluginError>;
}

/// Plugin that contributes translation instructions.
pub trait PromptPlugin: Send + Sync {
    /// Returns text appended to the translation prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin fails.
    fn contribute(&self, ctx: &PromptContext<'_>) -> Result<String, PluginError>;
}

/// Plugin that post-processes translated entries.
pub trait ExtensionPlugin: Send + Sync {
    /// Returns the entries to keep; removed entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin fails.
    fn process(&self, entries: Vec<TranslationEntry>) -> Result<Vec<TranslationEntry>, PluginError>;
}
