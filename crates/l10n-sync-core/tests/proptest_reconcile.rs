// crates/l10n-sync-core/tests/proptest_reconcile.rs
// ============================================================================
// Module: Reconciliation Property-Based Tests
// Description: Property tests for reconciliation determinism and convergence.
// Purpose: Detect order sensitivity and non-convergence across random inputs.
// ============================================================================

//! Property-based tests for reconciliation invariants.

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
use std::collections::BTreeSet;

use l10n_sync_core::BackendId;
use l10n_sync_core::BackendKeyRecord;
use l10n_sync_core::BackendSnapshot;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationStatus;
use l10n_sync_core::runtime::ExtractedKeys;
use l10n_sync_core::runtime::ReconcileScope;
use l10n_sync_core::runtime::reconcile;
use proptest::prelude::*;

const LOCALES: [&str; 4] = ["en", "de", "fr", "ja"];

fn supported() -> Vec<SupportedLocale> {
    LOCALES.iter().map(|code| SupportedLocale::new(*code, *code)).collect()
}

/// (identifier index, locale index, platform is iOS, value)
type RawEntry = (u8, usize, bool, String);

fn raw_entries() -> impl Strategy<Value = Vec<RawEntry>> {
    prop::collection::vec((0u8 .. 12, 0usize .. LOCALES.len(), any::<bool>(), "[a-z ]{0,6}"), 0 .. 40)
}

fn platform(ios: bool) -> Platform {
    if ios { Platform::Ios } else { Platform::Android }
}

fn build_snapshot(entries: &[RawEntry]) -> BackendSnapshot {
    let mut snapshot = BackendSnapshot::new();
    let mut platforms: BTreeMap<u8, BTreeSet<Platform>> = BTreeMap::new();
    for (id, _, ios, _) in entries {
        platforms.entry(*id).or_default().insert(platform(*ios));
    }
    for (id, set) in platforms {
        snapshot.insert_key(format!("key_{id}"), BackendKeyRecord::new(u64::from(id), set));
    }
    for (position, (id, locale, ios, value)) in entries.iter().enumerate() {
        let identifier = format!("key_{id}");
        let key = LocalizationKey::bare(identifier, platform(*ios));
        let backend_id = BackendId::from(u64::try_from(position).unwrap());
        let mut entry = TranslationEntry::missing(key, LocaleCode::new(LOCALES[*locale]), Some(backend_id));
        entry.value = Some(value.clone());
        entry.status = TranslationStatus::Uploaded;
        snapshot.insert_entry(entry);
    }
    snapshot
}

fn build_extracted(ids: &BTreeSet<(u8, bool)>) -> ExtractedKeys {
    let mut keys: ExtractedKeys = BTreeMap::new();
    for (id, ios) in ids {
        keys.entry(platform(*ios)).or_default().insert(LocalizationKey::bare(format!("key_{id}"), platform(*ios)));
    }
    keys
}

proptest! {
    #[test]
    fn reconcile_ignores_backend_entry_order(
        raw in raw_entries(),
        ids in prop::collection::btree_set((0u8 .. 12, any::<bool>()), 0 .. 16),
    ) {
        let supported = supported();
        let excluded = BTreeSet::new();
        let base = LocaleCode::new("en");
        let scope = ReconcileScope { supported: &supported, excluded: &excluded, base_locale: &base };
        let extracted = build_extracted(&ids);

        let forward = reconcile(&extracted, &build_snapshot(&raw), &scope);
        let mut reversed_raw = raw.clone();
        reversed_raw.reverse();
        let reversed = reconcile(&extracted, &build_snapshot(&reversed_raw), &scope);

        let strip = |entries: &[TranslationEntry]| -> Vec<_> {
            entries.iter().map(|entry| (entry.id(), entry.key.base_value.clone())).collect()
        };
        prop_assert_eq!(strip(&forward.missing), strip(&reversed.missing));
        prop_assert_eq!(forward.unused, reversed.unused);
    }

    #[test]
    fn writing_missing_entries_converges(
        raw in raw_entries(),
        ids in prop::collection::btree_set((0u8 .. 12, any::<bool>()), 0 .. 16),
    ) {
        let supported = supported();
        let excluded = BTreeSet::new();
        let base = LocaleCode::new("en");
        let scope = ReconcileScope { supported: &supported, excluded: &excluded, base_locale: &base };
        let extracted = build_extracted(&ids);
        let mut snapshot = build_snapshot(&raw);

        let first = reconcile(&extracted, &snapshot, &scope);
        prop_assert!(first.missing.iter().all(|entry| entry.locale != base));
        for mut entry in first.missing {
            entry.value = Some(format!("{} translated", entry.key.identifier));
            entry.status = TranslationStatus::Uploaded;
            snapshot.insert_entry(entry);
        }
        let second = reconcile(&extracted, &snapshot, &scope);
        prop_assert!(second.missing.is_empty());
    }
}
