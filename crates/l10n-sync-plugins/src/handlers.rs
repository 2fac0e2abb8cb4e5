// crates/l10n-sync-plugins/src/handlers.rs
// ============================================================================
// Module: Built-in Plugin Handlers
// Description: Handlers that manifests can bind to.
// Purpose: Implement prompt text, translation injection, and pattern filtering.
// Dependencies: l10n-sync-core, l10n-sync-store-csv, csv, regex
// ============================================================================

//! ## Overview
//! Three handlers ship with the registry:
//! - `prompt_text` (prompt): contributes a fixed instruction block.
//! - `inject_translations` (action): bypasses machine translation with values
//!   from a reviewed `key,locale,value` CSV, when that file exists.
//! - `pattern_filter` (extension): removes entries whose base or translated
//!   value matches a regular expression.
//!
//! Relative paths in handler parameters resolve against the plugin directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use csv::ReaderBuilder;
use l10n_sync_core::ActionContext;
use l10n_sync_core::ActionOutcome;
use l10n_sync_core::ActionPlugin;
use l10n_sync_core::BypassValue;
use l10n_sync_core::ExtensionPlugin;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::Platform;
use l10n_sync_core::PluginError;
use l10n_sync_core::PluginKind;
use l10n_sync_core::PromptContext;
use l10n_sync_core::PromptPlugin;
use l10n_sync_core::TranslationEntry;
use l10n_sync_store_csv::detect_delimiter;
use regex::Regex;
use regex::RegexBuilder;
use tracing::debug;

use crate::manifest::PluginManifest;

// ============================================================================
// SECTION: Handles
// ============================================================================

/// Typed handle produced for one plugin.
#[derive(Clone)]
pub enum PluginHandle {
    /// Action plugin.
    Action(Arc<dyn ActionPlugin>),
    /// Prompt plugin.
    Prompt(Arc<dyn PromptPlugin>),
    /// Extension plugin.
    Extension(Arc<dyn ExtensionPlugin>),
}

impl PluginHandle {
    /// Returns the extension point of this handle.
    #[must_use]
    pub const fn kind(&self) -> PluginKind {
        match self {
            Self::Action(_) => PluginKind::Action,
            Self::Prompt(_) => PluginKind::Prompt,
            Self::Extension(_) => PluginKind::Extension,
        }
    }
}

/// Builds the handler a manifest names.
///
/// # Errors
///
/// Returns [`PluginError::Invalid`] for unknown handlers, handlers that do not
/// implement the declared kind, or invalid parameters.
pub fn build_handler(kind: PluginKind, manifest: &PluginManifest, base_dir: &Path) -> Result<PluginHandle, PluginError> {
    let handle = match manifest.handler.as_str() {
        "prompt_text" => PluginHandle::Prompt(Arc::new(PromptText::from_manifest(manifest, base_dir)?)),
        "inject_translations" => {
            PluginHandle::Action(Arc::new(InjectTranslations::from_manifest(manifest, base_dir)?))
        }
        "pattern_filter" => PluginHandle::Extension(Arc::new(PatternFilter::from_manifest(manifest)?)),
        other => return Err(PluginError::Invalid(format!("unknown handler `{other}`"))),
    };
    if handle.kind() != kind {
        return Err(PluginError::Invalid(format!(
            "handler `{}` implements {} plugins, manifest declares {kind}",
            manifest.handler,
            handle.kind()
        )));
    }
    Ok(handle)
}

/// Resolves a parameter path against the plugin directory.
fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

// ============================================================================
// SECTION: Prompt Text
// ============================================================================

/// Where prompt text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TextSource {
    /// Inline text.
    Inline(String),
    /// File read on every contribution.
    File(PathBuf),
}

/// Prompt plugin contributing a fixed instruction block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    /// Text source.
    source: TextSource,
}

impl PromptText {
    /// Creates a plugin contributing inline `text`.
    #[must_use]
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            source: TextSource::Inline(text.into()),
        }
    }

    /// Creates a plugin contributing the contents of `path`.
    #[must_use]
    pub const fn file(path: PathBuf) -> Self {
        Self {
            source: TextSource::File(path),
        }
    }

    /// Reads `text` or `text_file` from a manifest.
    fn from_manifest(manifest: &PluginManifest, base_dir: &Path) -> Result<Self, PluginError> {
        match (manifest.param_str("text"), manifest.param_str("text_file")) {
            (Some(text), None) => Ok(Self::inline(text)),
            (None, Some(file)) => Ok(Self::file(resolve(base_dir, file))),
            (Some(_), Some(_)) => Err(PluginError::Invalid("set either `text` or `text_file`, not both".to_string())),
            (None, None) => Err(PluginError::Invalid("prompt_text requires `text` or `text_file`".to_string())),
        }
    }
}

impl PromptPlugin for PromptText {
    fn contribute(&self, _ctx: &PromptContext<'_>) -> Result<String, PluginError> {
        match &self.source {
            TextSource::Inline(text) => Ok(text.clone()),
            TextSource::File(path) => fs::read_to_string(path)
                .map_err(|err| PluginError::Failed(format!("read {}: {err}", path.display()))),
        }
    }
}

// ============================================================================
// SECTION: Inject Translations
// ============================================================================

/// Action plugin replaying reviewed translations from a CSV file.
///
/// # Invariants
/// - An absent file means "no opinion": the plugin continues.
/// - Rows with a blank value are ignored, so their keys are deferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectTranslations {
    /// CSV file with `key`, `locale`, `value`, and optional `platform` columns.
    path: PathBuf,
}

impl InjectTranslations {
    /// Creates a plugin reading `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
        }
    }

    /// Reads `file` from a manifest.
    fn from_manifest(manifest: &PluginManifest, base_dir: &Path) -> Result<Self, PluginError> {
        let file = manifest
            .param_str("file")
            .ok_or_else(|| PluginError::Invalid("inject_translations requires `file`".to_string()))?;
        Ok(Self::new(resolve(base_dir, file)))
    }

    /// Parses the injection file.
    fn read_values(&self) -> Result<Vec<BypassValue>, PluginError> {
        let failed = |message: String| PluginError::Failed(format!("{}: {message}", self.path.display()));
        let text = fs::read_to_string(&self.path).map_err(|err| failed(err.to_string()))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        let delimiter = detect_delimiter(text.lines().next().unwrap_or_default());
        let mut reader = ReaderBuilder::new().delimiter(delimiter).flexible(true).from_reader(text.as_bytes());
        let headers = reader.headers().map_err(|err| failed(err.to_string()))?.clone();
        let column = |name: &str| headers.iter().position(|header| header.trim().eq_ignore_ascii_case(name));
        let (Some(key), Some(locale), Some(value)) = (column("key"), column("locale"), column("value")) else {
            return Err(failed("expected columns key, locale, value".to_string()));
        };
        let platform = column("platform");

        let mut values = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| failed(err.to_string()))?;
            let field = |index: usize| record.get(index).unwrap_or_default();
            let (identifier, code, translated) = (field(key).trim(), field(locale).trim(), field(value));
            if identifier.is_empty() || code.is_empty() || translated.trim().is_empty() {
                continue;
            }
            let platform = match platform.map(field).map(str::trim).filter(|label| !label.is_empty()) {
                None => None,
                Some(label) => {
                    Some(Platform::parse(label).ok_or_else(|| failed(format!("unknown platform `{label}`")))?)
                }
            };
            values.push(BypassValue {
                identifier: identifier.to_string(),
                locale: LocaleCode::new(code),
                platform,
                value: translated.to_string(),
            });
        }
        Ok(values)
    }
}

impl ActionPlugin for InjectTranslations {
    fn run(&self, ctx: &ActionContext<'_>) -> Result<ActionOutcome, PluginError> {
        if !self.path.is_file() {
            debug!(run_id = %ctx.run_id, path = %self.path.display(), "no injection file; continuing");
            return Ok(ActionOutcome::Continue);
        }
        let values = self.read_values()?;
        debug!(run_id = %ctx.run_id, values = values.len(), "injecting reviewed translations");
        Ok(ActionOutcome::Bypass(values))
    }
}

// ============================================================================
// SECTION: Pattern Filter
// ============================================================================

/// Extension plugin dropping entries whose text matches a pattern.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    /// Compiled pattern.
    pattern: Regex,
}

impl PatternFilter {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Invalid`] when the pattern does not compile.
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, PluginError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|err| PluginError::Invalid(format!("invalid pattern: {err}")))?;
        Ok(Self {
            pattern,
        })
    }

    /// Reads `pattern` and `case_insensitive` from a manifest.
    fn from_manifest(manifest: &PluginManifest) -> Result<Self, PluginError> {
        let pattern = manifest
            .param_str("pattern")
            .ok_or_else(|| PluginError::Invalid("pattern_filter requires `pattern`".to_string()))?;
        let case_insensitive = match manifest.params.get("case_insensitive") {
            None => false,
            Some(value) => value
                .as_bool()
                .ok_or_else(|| PluginError::Invalid("`case_insensitive` must be a boolean".to_string()))?,
        };
        Self::new(pattern, case_insensitive)
    }

    /// Returns true when `entry` should be filtered out.
    fn matches(&self, entry: &TranslationEntry) -> bool {
        self.pattern.is_match(&entry.key.base_value)
            || entry.value.as_deref().is_some_and(|value| self.pattern.is_match(value))
    }
}

impl ExtensionPlugin for PatternFilter {
    fn process(&self, entries: Vec<TranslationEntry>) -> Result<Vec<TranslationEntry>, PluginError> {
        Ok(entries.into_iter().filter(|entry| !self.matches(entry)).collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
