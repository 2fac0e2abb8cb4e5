// crates/l10n-sync-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared fakes and builders for l10n-sync-core tests.
// Purpose: Provide scripted collaborators for orchestrator and runtime tests.
// Dependencies: l10n-sync-core, async-trait, tokio
// ============================================================================

//! ## Overview
//! Provides an in-memory extractor, a scripted backend, and a scripted
//! translation provider, plus configuration and event helpers.

#![allow(
    dead_code,
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

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use l10n_sync_core::BackendClient;
use l10n_sync_core::BackendId;
use l10n_sync_core::BackendKeyRecord;
use l10n_sync_core::BackendSnapshot;
use l10n_sync_core::ExtractionError;
use l10n_sync_core::Extractor;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Orchestrator;
use l10n_sync_core::PipelineConfig;
use l10n_sync_core::PipelineServices;
use l10n_sync_core::PipelineState;
use l10n_sync_core::Platform;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationBatch;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationProvider;
use l10n_sync_core::TranslationStatus;
use l10n_sync_core::UploadOutcome;
use l10n_sync_core::UploadRejection;
use l10n_sync_core::runtime::InMemoryReportStore;
use l10n_sync_core::runtime::PipelineEvent;
use l10n_sync_core::runtime::PriceTable;
use l10n_sync_core::runtime::RetryPolicy;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedReceiver;

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Extractor returning fixed keys per platform.
#[derive(Default)]
pub struct StaticExtractor {
    keys: BTreeMap<Platform, BTreeSet<LocalizationKey>>,
    fail: bool,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bare keys (no base value) for `platform`.
    pub fn with_keys(mut self, platform: Platform, identifiers: &[&str]) -> Self {
        let keys = self.keys.entry(platform).or_default();
        for identifier in identifiers {
            keys.insert(LocalizationKey::bare(*identifier, platform));
        }
        self
    }

    /// Makes every scan fail.
    pub fn failing() -> Self {
        Self {
            keys: BTreeMap::new(),
            fail: true,
        }
    }
}

impl Extractor for StaticExtractor {
    fn scan(&self, root: &Path, platform: Platform) -> Result<BTreeSet<LocalizationKey>, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::MissingRoot(root.display().to_string()));
        }
        Ok(self.keys.get(&platform).cloned().unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    snapshot: BackendSnapshot,
    fetches: usize,
    uploads: Vec<Vec<TranslationEntry>>,
    deletes: Vec<Vec<BackendId>>,
    reject: BTreeSet<String>,
    fetch_failures: VecDeque<ProviderFailure>,
}

/// Scripted in-memory backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    pub fn new(snapshot: BackendSnapshot) -> Self {
        Self {
            state: Mutex::new(BackendState {
                snapshot,
                ..BackendState::default()
            }),
        }
    }

    /// Rejects uploads for `identifier`.
    pub fn reject(self, identifier: &str) -> Self {
        self.state.lock().unwrap().reject.insert(identifier.to_string());
        self
    }

    /// Queues a failure for the next snapshot fetch.
    pub fn fail_fetch(self, failure: ProviderFailure) -> Self {
        self.state.lock().unwrap().fetch_failures.push_back(failure);
        self
    }

    pub fn fetches(&self) -> usize {
        self.state.lock().unwrap().fetches
    }

    pub fn uploads(&self) -> Vec<Vec<TranslationEntry>> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn uploaded_entries(&self) -> Vec<TranslationEntry> {
        self.uploads().into_iter().flatten().collect()
    }

    pub fn deletes(&self) -> Vec<Vec<BackendId>> {
        self.state.lock().unwrap().deletes.clone()
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn fetch_snapshot(
        &self,
        _project_id: &str,
        _locales: &[SupportedLocale],
    ) -> Result<BackendSnapshot, ProviderFailure> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.fetch_failures.pop_front() {
            return Err(failure);
        }
        state.fetches += 1;
        Ok(state.snapshot.clone())
    }

    async fn upload(
        &self,
        _project_id: &str,
        entries: &[TranslationEntry],
    ) -> Result<UploadOutcome, ProviderFailure> {
        let mut state = self.state.lock().unwrap();
        let mut outcome = UploadOutcome::default();
        for entry in entries {
            if state.reject.contains(&entry.key.identifier) {
                outcome.rejected.push(UploadRejection {
                    entry: entry.id(),
                    reason: "rejected by test backend".to_string(),
                });
                continue;
            }
            let mut stored = entry.clone();
            stored.status = TranslationStatus::Uploaded;
            state.snapshot.insert_entry(stored);
            outcome.accepted.push(entry.id());
        }
        state.uploads.push(entries.to_vec());
        Ok(outcome)
    }

    async fn delete(&self, _project_id: &str, key_ids: &[BackendId]) -> Result<(), ProviderFailure> {
        let mut state = self.state.lock().unwrap();
        state.snapshot.keys.retain(|_, record| !key_ids.contains(&record.key_id));
        state.deletes.push(key_ids.to_vec());
        Ok(())
    }
}

// ============================================================================
// SECTION: Translator
// ============================================================================

#[derive(Default)]
struct TranslatorState {
    calls: Vec<(LocaleCode, usize, String)>,
    failures: VecDeque<ProviderFailure>,
}

/// Translator that prefixes the base value with the locale code.
#[derive(Default)]
pub struct FakeTranslator {
    state: Mutex<TranslatorState>,
    gate: Option<Arc<Semaphore>>,
    delays: BTreeMap<LocaleCode, Duration>,
}

impl FakeTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failure for the next call.
    pub fn fail_next(self, failure: ProviderFailure) -> Self {
        self.state.lock().unwrap().failures.push_back(failure);
        self
    }

    /// Blocks every call until the gate has a permit.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Delays calls for `locale`.
    pub fn delay(mut self, locale: &str, delay: Duration) -> Self {
        self.delays.insert(LocaleCode::new(locale), delay);
        self
    }

    /// Returns `(locale, key count, prompt addendum)` per call.
    pub fn calls(&self) -> Vec<(LocaleCode, usize, String)> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl TranslationProvider for FakeTranslator {
    async fn translate(
        &self,
        batch: &TranslationBatch,
        prompt_addendum: &str,
    ) -> Result<BTreeMap<LocalizationKey, String>, ProviderFailure> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if let Some(delay) = self.delays.get(&batch.locale.code) {
            tokio::time::sleep(*delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push((batch.locale.code.clone(), batch.keys.len(), prompt_addendum.to_string()));
        if let Some(failure) = state.failures.pop_front() {
            return Err(failure);
        }
        drop(state);
        Ok(batch
            .keys
            .iter()
            .map(|key| (key.clone(), format!("[{}] {}", batch.locale.code, key.base_value)))
            .collect())
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// English base plus German and French targets.
pub fn locales() -> Vec<SupportedLocale> {
    vec![
        SupportedLocale::new("en", "English"),
        SupportedLocale::new("de", "German"),
        SupportedLocale::new("fr", "French"),
    ]
}

/// Configuration with an iOS source root and a fast retry policy.
pub fn config() -> PipelineConfig {
    let model = PriceTable::builtin().profile("gpt-4o-mini").unwrap().clone();
    let mut config = PipelineConfig::new("project-1", model);
    config.sources.insert(Platform::Ios, PathBuf::from("/src/ios"));
    config.locales = locales();
    config.retry = RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter: false,
    };
    config
}

/// Backend translation entry with a value.
pub fn backend_entry(identifier: &str, locale: &str, value: &str, id: u64) -> TranslationEntry {
    let key = LocalizationKey::bare(identifier, Platform::Ios);
    let mut entry = TranslationEntry::missing(key, LocaleCode::new(locale), Some(BackendId::from(id)));
    entry.value = Some(value.to_string());
    entry.status = TranslationStatus::Uploaded;
    entry
}

/// Snapshot with English values for every identifier and the given extra entries.
pub fn snapshot(identifiers: &[(&str, &str, u64)], extra: Vec<TranslationEntry>) -> BackendSnapshot {
    let mut snapshot = BackendSnapshot::new();
    for (identifier, english, key_id) in identifiers {
        snapshot.insert_key(*identifier, BackendKeyRecord::new(*key_id, [Platform::Ios]));
        snapshot.insert_entry(backend_entry(identifier, "en", english, key_id * 100));
    }
    for entry in extra {
        snapshot.insert_entry(entry);
    }
    snapshot
}

/// Collaborators wired to the given fakes.
pub fn services(
    extractor: StaticExtractor,
    backend: &Arc<FakeBackend>,
    translator: &Arc<FakeTranslator>,
    store: &InMemoryReportStore,
) -> PipelineServices {
    PipelineServices::new(
        Arc::new(extractor),
        Arc::clone(backend) as Arc<dyn BackendClient>,
        Arc::clone(translator) as Arc<dyn TranslationProvider>,
        Arc::new(store.clone()),
    )
}

// ============================================================================
// SECTION: Run Helpers
// ============================================================================

/// Waits until the current run publishes `state`.
pub async fn wait_for_state(orchestrator: &Orchestrator, state: PipelineState) {
    let mut watcher = orchestrator.watch_state().await.unwrap();
    watcher.wait_for(|current| *current == state).await.unwrap();
}

/// Drains every event received so far.
pub fn drain(receiver: &mut UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
