// crates/l10n-sync-core/tests/plugins.rs
// ============================================================================
// Module: Plugin Dispatch Tests
// Description: Tests for action, prompt, and extension dispatch policies.
// ============================================================================
//! ## Overview
//! Validates first-bypass-wins, prompt joining, extension pipelines, and
//! contract violations reported by dispatch.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use l10n_sync_core::ActionContext;
use l10n_sync_core::ActionOutcome;
use l10n_sync_core::ActionPlugin;
use l10n_sync_core::BypassValue;
use l10n_sync_core::ExtensionPlugin;
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
use l10n_sync_core::runtime::PluginSet;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

struct CountingAction {
    calls: AtomicUsize,
    outcome: ActionOutcome,
}

impl CountingAction {
    fn new(outcome: ActionOutcome) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            outcome,
        })
    }
}

impl ActionPlugin for CountingAction {
    fn run(&self, _ctx: &ActionContext<'_>) -> Result<ActionOutcome, PluginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

struct FailingAction;

impl ActionPlugin for FailingAction {
    fn run(&self, _ctx: &ActionContext<'_>) -> Result<ActionOutcome, PluginError> {
        Err(PluginError::Failed("source file unreadable".to_string()))
    }
}

struct Text(&'static str);

impl PromptPlugin for Text {
    fn contribute(&self, _ctx: &PromptContext<'_>) -> Result<String, PluginError> {
        Ok(self.0.to_string())
    }
}

/// Extension applying a closure to the entry list.
struct MapExtension<F>(F);

impl<F> ExtensionPlugin for MapExtension<F>
where
    F: Fn(Vec<TranslationEntry>) -> Vec<TranslationEntry> + Send + Sync,
{
    fn process(&self, entries: Vec<TranslationEntry>) -> Result<Vec<TranslationEntry>, PluginError> {
        Ok((self.0)(entries))
    }
}

fn translated(identifier: &str, locale: &str) -> TranslationEntry {
    let key = LocalizationKey::new(identifier, Platform::Ios, "Hello");
    let mut entry = TranslationEntry::missing(key, LocaleCode::new(locale), None);
    entry.mark_translated("Hallo", TranslationOrigin::Provider).unwrap();
    entry
}

fn bypass(value: &str) -> ActionOutcome {
    ActionOutcome::Bypass(vec![BypassValue {
        identifier: "greeting".to_string(),
        locale: LocaleCode::new("de"),
        platform: None,
        value: value.to_string(),
    }])
}

// ============================================================================
// SECTION: Action Dispatch
// ============================================================================

#[test]
fn first_bypass_wins_and_later_plugins_are_not_run() {
    let pass = CountingAction::new(ActionOutcome::Continue);
    let first = CountingAction::new(bypass("first"));
    let second = CountingAction::new(bypass("second"));
    let plugins = PluginSet::new()
        .with_action("pass", true, pass.clone())
        .with_action("first", true, first.clone())
        .with_action("second", true, second.clone());

    let run_id = RunId::new("run-1");
    let result = plugins.dispatch_action(&ActionContext { run_id: &run_id, entries: &[] }).unwrap();
    assert!(result.bypassed);
    assert_eq!(result.plugin.unwrap().as_str(), "first");
    assert_eq!(result.payload[0].value, "first");
    assert_eq!(pass.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn disabled_plugins_are_listed_but_not_dispatched() {
    let disabled = CountingAction::new(bypass("x"));
    let plugins = PluginSet::new().with_action("disabled", false, disabled.clone());
    let run_id = RunId::new("run-1");
    let result = plugins.dispatch_action(&ActionContext { run_id: &run_id, entries: &[] }).unwrap();
    assert!(!result.bypassed);
    assert_eq!(disabled.calls.load(Ordering::SeqCst), 0);
    assert_eq!(plugins.descriptors().len(), 1);
    assert!(!plugins.descriptors()[0].enabled);
    assert_eq!(plugins.enabled_count(PluginKind::Action), 0);
}

#[test]
fn action_failure_names_the_plugin() {
    let plugins = PluginSet::new().with_action("broken", true, Arc::new(FailingAction));
    let run_id = RunId::new("run-1");
    let err = plugins.dispatch_action(&ActionContext { run_id: &run_id, entries: &[] }).unwrap_err();
    assert_eq!(err.plugin.as_str(), "broken");
    assert_eq!(err.kind, PluginKind::Action);
}

// ============================================================================
// SECTION: Prompt Dispatch
// ============================================================================

#[test]
fn prompt_contributions_join_in_order_skipping_blanks() {
    let plugins = PluginSet::new()
        .with_prompt("tone", true, Arc::new(Text("  Use a friendly tone.  ")))
        .with_prompt("blank", true, Arc::new(Text("   ")))
        .with_prompt("glossary", true, Arc::new(Text("Never translate Acme.")));
    let run_id = RunId::new("run-1");
    let addendum = plugins.dispatch_prompt(&PromptContext { run_id: &run_id, locales: &[] }).unwrap();
    assert_eq!(addendum, "Use a friendly tone.\nNever translate Acme.");
}

#[test]
fn no_prompt_plugins_yield_empty_addendum() {
    let run_id = RunId::new("run-1");
    let addendum = PluginSet::new().dispatch_prompt(&PromptContext { run_id: &run_id, locales: &[] }).unwrap();
    assert!(addendum.is_empty());
}

// ============================================================================
// SECTION: Extension Dispatch
// ============================================================================

#[test]
fn extensions_compose_and_dropped_entries_become_skipped() {
    let plugins = PluginSet::new()
        .with_extension(
            "uppercase",
            true,
            Arc::new(MapExtension(|entries: Vec<TranslationEntry>| {
                entries
                    .into_iter()
                    .map(|mut entry| {
                        entry.value = entry.value.map(|value| value.to_uppercase());
                        entry
                    })
                    .collect()
            })),
        )
        .with_extension(
            "drop-french",
            true,
            Arc::new(MapExtension(|entries: Vec<TranslationEntry>| {
                entries.into_iter().filter(|entry| entry.locale.as_str() != "fr").collect()
            })),
        );

    let output = plugins.dispatch_extension(vec![translated("greeting", "fr"), translated("greeting", "de")]).unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0].locale.as_str(), "de");
    assert_eq!(output[0].value.as_deref(), Some("HALLO"));
    assert_eq!(output[1].status, TranslationStatus::Skipped);
}

#[test]
fn extensions_cannot_introduce_entries() {
    let plugins = PluginSet::new().with_extension(
        "inventor",
        true,
        Arc::new(MapExtension(|mut entries: Vec<TranslationEntry>| {
            entries.push(translated("invented", "de"));
            entries
        })),
    );
    let err = plugins.dispatch_extension(vec![translated("greeting", "de")]).unwrap_err();
    assert_eq!(err.plugin.as_str(), "inventor");
    assert!(err.message.contains("did not receive"));
}

#[test]
fn extensions_cannot_revert_status() {
    let plugins = PluginSet::new().with_extension(
        "reverter",
        true,
        Arc::new(MapExtension(|entries: Vec<TranslationEntry>| {
            entries
                .into_iter()
                .map(|mut entry| {
                    entry.status = TranslationStatus::Missing;
                    entry
                })
                .collect()
        })),
    );
    assert!(plugins.dispatch_extension(vec![translated("greeting", "de")]).is_err());
}

#[test]
fn plugin_set_snapshot_is_independent() {
    let plugins = PluginSet::new().with_prompt("tone", true, Arc::new(Text("x")));
    let snapshot = plugins.snapshot().unwrap();
    let extended = plugins.with_prompt("more", true, Arc::new(Text("y")));
    assert_eq!(snapshot.enabled_count(PluginKind::Prompt), 1);
    assert_eq!(extended.enabled_count(PluginKind::Prompt), 2);
}
