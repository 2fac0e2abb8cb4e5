// crates/l10n-sync-plugins/src/manifest.rs
// ============================================================================
// Module: Plugin Manifests
// Description: TOML manifest model for discovered plugins.
// Purpose: Parse and bound-check the per-plugin manifest files.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! A manifest declares the extension point and the handler backing a plugin:
//!
//! ```toml
//! kind = "extension"
//! handler = "pattern_filter"
//! description = "Drop strings that mention soft-pos"
//!
//! [params]
//! pattern = "soft-?pos"
//! case_insensitive = true
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum manifest size in bytes.
pub const MAX_MANIFEST_BYTES: u64 = 64 * 1024;

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Parsed plugin manifest.
///
/// # Invariants
/// - `kind` is the raw marker; classification happens in the registry so an
///   unknown marker becomes a discovery issue instead of a parse error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    /// Extension point marker (`action`, `prompt`, or `extension`).
    pub kind: String,
    /// Built-in handler name.
    pub handler: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Handler parameters.
    #[serde(default)]
    pub params: toml::Table,
}

impl PluginManifest {
    /// Parses manifest text.
    ///
    /// # Errors
    ///
    /// Returns a message when the text is not a valid manifest.
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| err.message().to_string())
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns a message when the file is too large, unreadable, or invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let metadata = fs::metadata(path).map_err(|err| format!("read failed: {err}"))?;
        if metadata.len() > MAX_MANIFEST_BYTES {
            return Err(format!("manifest exceeds {MAX_MANIFEST_BYTES} bytes"));
        }
        let text = fs::read_to_string(path).map_err(|err| format!("read failed: {err}"))?;
        Self::parse(&text)
    }

    /// Returns a string parameter.
    #[must_use]
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(toml::Value::as_str)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test assertions use unwrap for clarity.")]

    use super::PluginManifest;

    #[test]
    fn manifest_parses_kind_handler_and_params() {
        let manifest = PluginManifest::parse(
            "kind = \"prompt\"\nhandler = \"prompt_text\"\n[params]\ntext = \"Keep it short.\"\n",
        )
        .unwrap();
        assert_eq!(manifest.kind, "prompt");
        assert_eq!(manifest.handler, "prompt_text");
        assert_eq!(manifest.description, None);
        assert_eq!(manifest.param_str("text"), Some("Keep it short."));
        assert_eq!(manifest.param_str("missing"), None);
    }

    #[test]
    fn manifest_rejects_unknown_top_level_fields() {
        assert!(PluginManifest::parse("kind = \"prompt\"\nhandler = \"prompt_text\"\ntext = \"x\"\n").is_err());
        assert!(PluginManifest::parse("handler = \"prompt_text\"\n").is_err());
    }
}
