// crates/l10n-sync-plugins/tests/discovery.rs
// ============================================================================
// Module: Plugin Discovery Tests
// Description: Tests for manifest discovery, enablement, and built-in handlers.
// Purpose: Validate ordering, exclusion of bad manifests, and snapshot dispatch.
// ============================================================================

//! ## Overview
//! Builds plugin directories in a temporary folder and checks:
//! - Manifests load in file-name order; bad manifests become issues
//! - Enablement overrides and `auto_discover`
//! - Configured but absent plugins are reported as missing
//! - Snapshots dispatch the built-in handlers end to end

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
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use l10n_sync_core::ActionContext;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::PluginError;
use l10n_sync_core::PluginKind;
use l10n_sync_core::PromptContext;
use l10n_sync_core::PromptPlugin;
use l10n_sync_core::RunId;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationOrigin;
use l10n_sync_core::TranslationStatus;
use l10n_sync_core::runtime::PluginCatalog;
use l10n_sync_plugins::PluginRegistry;
use l10n_sync_plugins::PluginRegistryError;
use l10n_sync_plugins::PluginSettings;
use l10n_sync_plugins::PluginSource;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn plugin_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "20_tone.toml",
        "kind = \"prompt\"\nhandler = \"prompt_text\"\ndescription = \"House style\"\n[params]\ntext = \"Use a \
         friendly tone.\"\n",
    );
    write(dir.path(), "10_glossary.toml", "kind = \"prompt\"\nhandler = \"prompt_text\"\n[params]\ntext_file = \"glossary.txt\"\n");
    write(dir.path(), "glossary.txt", "Never translate Acme.");
    write(
        dir.path(),
        "30_softpos.toml",
        "kind = \"extension\"\nhandler = \"pattern_filter\"\n[params]\npattern = \"soft-?pos\"\ncase_insensitive = true\n",
    );
    write(dir.path(), "40_inject.toml", "kind = \"action\"\nhandler = \"inject_translations\"\n[params]\nfile = \"reviewed.csv\"\n");
    write(dir.path(), "README.md", "not a manifest");
    dir
}

fn settings(auto_discover: bool, enabled: &[(&str, bool)]) -> PluginSettings {
    PluginSettings {
        auto_discover,
        enabled: enabled.iter().map(|(name, on)| ((*name).to_string(), *on)).collect::<BTreeMap<_, _>>(),
    }
}

fn missing(identifier: &str, locale: &str, base: &str) -> TranslationEntry {
    TranslationEntry::missing(LocalizationKey::new(identifier, Platform::Ios, base), LocaleCode::new(locale), None)
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

#[test]
fn manifests_load_in_file_name_order() {
    let dir = plugin_dir();
    let registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    let names: Vec<String> = registry.listings().iter().map(|listing| listing.name.to_string()).collect();
    assert_eq!(names, vec!["10_glossary", "20_tone", "30_softpos", "40_inject"]);
    let listings = registry.listings();
    assert_eq!(listings[1].kind, PluginKind::Prompt);
    assert_eq!(listings[1].description.as_deref(), Some("House style"));
    assert_eq!(listings[2].kind, PluginKind::Extension);
    assert_eq!(listings[3].kind, PluginKind::Action);
    assert!(matches!(listings[0].source, PluginSource::Manifest(_)));
    assert!(registry.issues().is_empty());
}

#[test]
fn bad_manifests_are_recorded_and_excluded() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_unknown_kind.toml", "kind = \"macro\"\nhandler = \"prompt_text\"\n");
    write(dir.path(), "b_unknown_handler.toml", "kind = \"action\"\nhandler = \"shell\"\n");
    write(dir.path(), "c_bad_params.toml", "kind = \"extension\"\nhandler = \"pattern_filter\"\n[params]\npattern = \"(\"\n");
    write(dir.path(), "d_not_toml.toml", "kind = ");
    write(dir.path(), "e_good.toml", "kind = \"prompt\"\nhandler = \"prompt_text\"\n[params]\ntext = \"ok\"\n");

    let registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    assert_eq!(registry.listings().len(), 1);
    assert_eq!(registry.issues().len(), 4);
    assert!(registry.issues()[0].message.contains("macro"));
    assert!(registry.issues()[1].message.contains("shell"));
    assert!(registry.issues()[0].to_string().contains("a_unknown_kind.toml"));
}

#[test]
fn missing_directory_yields_empty_registry() {
    let dir = TempDir::new().unwrap();
    let registry = PluginRegistry::discover(&dir.path().join("plugins"), PluginSettings::default()).unwrap();
    assert!(registry.listings().is_empty());
    assert!(registry.issues().is_empty());
}

// ============================================================================
// SECTION: Enablement
// ============================================================================

#[test]
fn explicit_entries_override_auto_discover() {
    let dir = plugin_dir();
    let registry =
        PluginRegistry::discover(dir.path(), settings(false, &[("20_tone", true), ("30_softpos", false)])).unwrap();
    let enabled: Vec<(String, bool)> =
        registry.listings().iter().map(|listing| (listing.name.to_string(), listing.enabled)).collect();
    assert_eq!(
        enabled,
        vec![
            ("10_glossary".to_string(), false),
            ("20_tone".to_string(), true),
            ("30_softpos".to_string(), false),
            ("40_inject".to_string(), false),
        ]
    );
    let set = registry.snapshot().unwrap();
    assert_eq!(set.descriptors().len(), 4);
    assert_eq!(set.enabled_count(PluginKind::Prompt), 1);
    assert_eq!(set.enabled_count(PluginKind::Extension), 0);
}

#[test]
fn configured_plugins_without_manifest_are_missing() {
    let dir = plugin_dir();
    let registry =
        PluginRegistry::discover(dir.path(), settings(true, &[("20_tone", true), ("legacy_filter", true)])).unwrap();
    assert_eq!(registry.missing(), vec!["legacy_filter".to_string()]);
}

// ============================================================================
// SECTION: Registration
// ============================================================================

struct Fixed;

impl PromptPlugin for Fixed {
    fn contribute(&self, _ctx: &PromptContext<'_>) -> Result<String, PluginError> {
        Ok("Compiled-in rule.".to_string())
    }
}

#[test]
fn compiled_plugins_follow_discovered_ones() {
    let dir = plugin_dir();
    let mut registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    registry.register_prompt("compiled", Arc::new(Fixed)).unwrap();
    assert_eq!(
        registry.register_prompt("20_tone", Arc::new(Fixed)),
        Err(PluginRegistryError::Duplicate("20_tone".to_string()))
    );
    let listings = registry.listings();
    assert_eq!(listings.last().unwrap().source, PluginSource::Compiled);

    let run_id = RunId::new("run-1");
    let addendum = registry.snapshot().unwrap().dispatch_prompt(&PromptContext { run_id: &run_id, locales: &[] }).unwrap();
    assert_eq!(addendum, "Never translate Acme.\nUse a friendly tone.\nCompiled-in rule.");
}

// ============================================================================
// SECTION: Built-in Handlers
// ============================================================================

#[test]
fn inject_translations_continues_until_the_file_exists() {
    let dir = plugin_dir();
    let registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    let run_id = RunId::new("run-1");
    let entries = vec![missing("greeting", "de", "Hello"), missing("title", "de", "Title")];
    let ctx = ActionContext { run_id: &run_id, entries: &entries };

    let result = registry.snapshot().unwrap().dispatch_action(&ctx).unwrap();
    assert!(!result.bypassed);

    write(dir.path(), "reviewed.csv", "key;locale;value;platform\ngreeting;de;Hallo;ios\ntitle;de;;\n");
    let result = registry.snapshot().unwrap().dispatch_action(&ctx).unwrap();
    assert!(result.bypassed);
    assert_eq!(result.plugin.unwrap().as_str(), "40_inject");
    assert_eq!(result.payload.len(), 1);
    assert_eq!(result.payload[0].value, "Hallo");
    assert_eq!(result.payload[0].platform, Some(Platform::Ios));
    assert!(result.payload[0].matches(&entries[0]));
}

#[test]
fn inject_translations_rejects_files_without_required_columns() {
    let dir = plugin_dir();
    write(dir.path(), "reviewed.csv", "identifier,text\ngreeting,Hallo\n");
    let registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    let run_id = RunId::new("run-1");
    let err = registry.snapshot().unwrap().dispatch_action(&ActionContext { run_id: &run_id, entries: &[] }).unwrap_err();
    assert_eq!(err.plugin.as_str(), "40_inject");
}

#[test]
fn pattern_filter_skips_matching_entries() {
    let dir = plugin_dir();
    let registry = PluginRegistry::discover(dir.path(), PluginSettings::default()).unwrap();
    let mut flagged = missing("pay", "de", "Pay with SoftPOS");
    flagged.mark_translated("Mit SoftPOS bezahlen", TranslationOrigin::Provider).unwrap();
    let mut kept = missing("greeting", "de", "Hello");
    kept.mark_translated("Hallo", TranslationOrigin::Provider).unwrap();

    let output = registry.snapshot().unwrap().dispatch_extension(vec![flagged, kept]).unwrap();
    let statuses: Vec<(String, TranslationStatus)> =
        output.iter().map(|entry| (entry.key.identifier.clone(), entry.status)).collect();
    assert!(statuses.contains(&("greeting".to_string(), TranslationStatus::Translated)));
    assert!(statuses.contains(&("pay".to_string(), TranslationStatus::Skipped)));
}
