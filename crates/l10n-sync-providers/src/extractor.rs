// crates/l10n-sync-providers/src/extractor.rs
// ============================================================================
// Module: Source Extractor
// Description: Regex-based scanner for localization keys in app sources.
// Purpose: Collect the keys an iOS or Android project references.
// Dependencies: l10n-sync-core, regex, walkdir
// ============================================================================

//! ## Overview
//! Walks a source tree and matches key references per platform:
//! - iOS: `NSLocalizedString("key", ...)` and `"key".localized` in Swift and
//!   Objective-C files.
//! - Android: `R.string.key` in Kotlin and Java, `@string/key` in XML.
//!
//! Build output and dependency directories are skipped. Files are decoded
//! lossily so stray bytes never abort a scan.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use l10n_sync_core::ExtractionError;
use l10n_sync_core::Extractor;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use regex::Regex;
use tracing::debug;
use walkdir::DirEntry;
use walkdir::WalkDir;

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Directory names never descended into.
pub const SKIPPED_DIRECTORIES: [&str; 5] = [".git", "build", "Pods", "node_modules", "DerivedData"];

/// File extensions scanned for iOS keys.
const IOS_EXTENSIONS: [&str; 2] = ["swift", "m"];
/// File extensions scanned for Android code references.
const ANDROID_CODE_EXTENSIONS: [&str; 2] = ["kt", "java"];

/// Compiled key patterns.
#[derive(Debug, Clone)]
pub struct SourceExtractor {
    /// `NSLocalizedString("key"` and `NSLocalizedString(@"key"`.
    ns_localized: Regex,
    /// `"key".localized`.
    dot_localized: Regex,
    /// `R.string.key`.
    android_code: Regex,
    /// `@string/key`.
    android_xml: Regex,
}

impl SourceExtractor {
    /// Compiles the key patterns.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            ns_localized: Regex::new(r#"NSLocalizedString\(\s*@?"([^"]+)""#)?,
            dot_localized: Regex::new(r#""([^"\\]+)"\.localized\b"#)?,
            android_code: Regex::new(r"R\.string\.([a-zA-Z0-9_]+)")?,
            android_xml: Regex::new(r"@string/([a-zA-Z0-9_]+)")?,
        })
    }

    /// Returns the patterns that apply to a file, if any.
    fn patterns_for(&self, path: &Path, platform: Platform) -> Vec<&Regex> {
        let Some(extension) = path.extension().and_then(|extension| extension.to_str()) else {
            return Vec::new();
        };
        let matches = |candidates: &[&str]| candidates.iter().any(|candidate| extension.eq_ignore_ascii_case(candidate));
        match platform {
            Platform::Ios if matches(&IOS_EXTENSIONS) => vec![&self.ns_localized, &self.dot_localized],
            Platform::Android if matches(&ANDROID_CODE_EXTENSIONS) => vec![&self.android_code],
            Platform::Android if matches(&["xml"]) => vec![&self.android_xml],
            _ => Vec::new(),
        }
    }

    /// Collects key identifiers found in `text`.
    fn collect(patterns: &[&Regex], text: &str, platform: Platform, keys: &mut BTreeSet<LocalizationKey>) {
        for pattern in patterns {
            for captures in pattern.captures_iter(text) {
                if let Some(identifier) = captures.get(1) {
                    keys.insert(LocalizationKey::bare(identifier.as_str(), platform));
                }
            }
        }
    }
}

/// Returns true for directories the walk should not enter.
fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name))
}

impl Extractor for SourceExtractor {
    fn scan(&self, root: &Path, platform: Platform) -> Result<BTreeSet<LocalizationKey>, ExtractionError> {
        if !root.is_dir() {
            return Err(ExtractionError::MissingRoot(root.display().to_string()));
        }
        let mut keys = BTreeSet::new();
        let mut files = 0_usize;
        for entry in WalkDir::new(root).follow_links(false).into_iter().filter_entry(|entry| !is_skipped(entry)) {
            let entry = entry.map_err(|err| ExtractionError::Io(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let patterns = self.patterns_for(entry.path(), platform);
            if patterns.is_empty() {
                continue;
            }
            let bytes =
                fs::read(entry.path()).map_err(|err| ExtractionError::Io(format!("{}: {err}", entry.path().display())))?;
            Self::collect(&patterns, &String::from_utf8_lossy(&bytes), platform, &mut keys);
            files += 1;
        }
        debug!(root = %root.display(), platform = platform.as_str(), files, keys = keys.len(), "source scan complete");
        Ok(keys)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
