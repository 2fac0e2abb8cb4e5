// crates/l10n-sync-core/src/runtime/worker.rs
// ============================================================================
// Module: L10n Sync Pipeline Worker
// Description: Background task that drives one run through every stage.
// Purpose: Own the run state machine, park at checkpoints, and classify failures.
// Dependencies: tokio, tracing, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The worker owns the [`PipelineRun`] and is the single writer of its state.
//! Stages run in a fixed order; cancellation is observed only at stage
//! boundaries, so no stage is interrupted mid side effect. At each checkpoint
//! the worker publishes the new state, emits the checkpoint event, and waits
//! on its command channel. Any stage failure moves the run to `Error` with a
//! classified [`StageFailure`]. The review report is claimed only while the
//! worker writes or reads it. [`supervise`] runs the worker in its own task
//! so a panic still leaves the run in `Error`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::BackendId;
use crate::core::BackendSnapshot;
use crate::core::EntryId;
use crate::core::LocaleCode;
use crate::core::LocalizationKey;
use crate::core::PipelineErrorKind;
use crate::core::PipelineRun;
use crate::core::PipelineState;
use crate::core::Stage;
use crate::core::StageFailure;
use crate::core::StatusTransitionError;
use crate::core::SupportedLocale;
use crate::core::TranslationEntry;
use crate::core::TranslationOrigin;
use crate::core::TranslationStatus;
use crate::core::UnusedKeyCandidate;
use crate::interfaces::ActionContext;
use crate::interfaces::PromptContext;
use crate::interfaces::ReportError;
use crate::interfaces::TranslationBatch;
use crate::interfaces::TranslationProvider;
use crate::runtime::cost;
use crate::runtime::events::Checkpoint;
use crate::runtime::events::EstimateReport;
use crate::runtime::events::EventEmitter;
use crate::runtime::gateway::Gateway;
use crate::runtime::gateway::GatewayError;
use crate::runtime::gateway::Lane;
use crate::runtime::orchestrator::Command;
use crate::runtime::orchestrator::CommandEnvelope;
use crate::runtime::orchestrator::CommandError;
use crate::runtime::orchestrator::PipelineConfig;
use crate::runtime::orchestrator::PipelineServices;
use crate::runtime::plugins::PluginExecutionError;
use crate::runtime::plugins::PluginSet;
use crate::runtime::reconcile::ExtractedKeys;
use crate::runtime::reconcile::ReconcileScope;
use crate::runtime::reconcile::reconcile;
use crate::runtime::reconcile::unused_keys;

// ============================================================================
// SECTION: Worker
// ============================================================================

/// Background driver for one run.
pub(crate) struct Worker {
    /// Run record owned by this worker.
    pub(crate) run: PipelineRun,
    /// Pipeline configuration.
    pub(crate) config: Arc<PipelineConfig>,
    /// Collaborators.
    pub(crate) services: PipelineServices,
    /// Shared gateway.
    pub(crate) gateway: Arc<Gateway>,
    /// Plugin snapshot captured at start.
    pub(crate) plugins: PluginSet,
    /// Event producer.
    pub(crate) events: EventEmitter,
    /// Published state.
    pub(crate) state: watch::Sender<PipelineState>,
    /// Stage most recently entered.
    pub(crate) stage: watch::Sender<Stage>,
    /// Checkpoint commands.
    pub(crate) commands: mpsc::Receiver<CommandEnvelope>,
    /// Cancellation flag.
    pub(crate) cancel: Arc<AtomicBool>,
    /// Keys extracted at the start of the run.
    pub(crate) extracted: ExtractedKeys,
}

impl Worker {
    /// Runs the pipeline to a terminal state and returns the final record.
    pub(crate) async fn drive(mut self) -> PipelineRun {
        info!(run_id = %self.run.run_id, "pipeline worker started");
        if let Err(failure) = self.execute().await {
            self.fail(failure);
        }
        self.run
    }

    /// Runs every stage in order.
    async fn execute(&mut self) -> Result<(), StageFailure> {
        self.translation_phase().await?;
        self.await_review().await?;
        self.upload_phase().await?;
        let candidates = self.find_unused_keys().await?;
        if !candidates.is_empty() {
            let approved = self.await_deletion_decision(candidates).await?;
            self.delete_keys(approved).await?;
        }
        self.enter(PipelineState::Completed, Stage::Deletion)?;
        info!(run_id = %self.run.run_id, uploaded = self.run.summary.uploaded, "pipeline run completed");
        self.events.completed(self.run.summary.clone());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Translation phase
    // ------------------------------------------------------------------------

    /// Extraction through the review report write.
    async fn translation_phase(&mut self) -> Result<(), StageFailure> {
        self.check_cancel(Stage::Extraction)?;
        self.extracted = self.extract().await?;

        self.check_cancel(Stage::Snapshot)?;
        let snapshot = self.fetch_snapshot(Stage::Snapshot).await?;
        self.events.progress(
            Stage::Snapshot,
            20,
            format!("fetched {} backend keys", snapshot.keys.len()),
        );
        self.run.complete_stage(Stage::Snapshot);

        self.check_cancel(Stage::Reconciliation)?;
        let missing = self.reconcile_keys(&snapshot)?;

        self.check_cancel(Stage::ActionPlugins)?;
        let mut entries = self.apply_action_plugins(missing)?;
        mark_empty_sources(&mut entries).map_err(|err| transition_failure(Stage::ActionPlugins, &err))?;

        self.check_cancel(Stage::CostEstimate)?;
        self.estimate_cost(&entries);

        self.check_cancel(Stage::PromptPlugins)?;
        let addendum = self.collect_prompt()?;

        self.check_cancel(Stage::Translation)?;
        self.reuse_previous_report(&mut entries)?;
        self.translate(&mut entries, addendum).await?;

        self.check_cancel(Stage::ExtensionPlugins)?;
        let entries = self
            .plugins
            .dispatch_extension(entries)
            .map_err(|err| plugin_failure(Stage::ExtensionPlugins, &err))?;
        self.events.progress(
            Stage::ExtensionPlugins,
            90,
            format!("{} entries after extension plugins", entries.len()),
        );
        self.run.complete_stage(Stage::ExtensionPlugins);

        self.check_cancel(Stage::ReportWrite)?;
        self.write_review_report(entries)
    }

    /// Scans every configured platform root off the async runtime.
    async fn extract(&mut self) -> Result<ExtractedKeys, StageFailure> {
        let sources: Vec<_> = self.config.sources.iter().map(|(p, root)| (*p, root.clone())).collect();
        let total = sources.len();
        let mut extracted = BTreeMap::new();
        for (index, (platform, root)) in sources.into_iter().enumerate() {
            let extractor = Arc::clone(&self.services.extractor);
            let keys = tokio::task::spawn_blocking(move || extractor.scan(&root, platform))
                .await
                .map_err(|err| {
                    StageFailure::new(
                        Stage::Extraction,
                        PipelineErrorKind::Extraction,
                        format!("extraction task failed: {err}"),
                    )
                })?
                .map_err(|err| StageFailure::new(Stage::Extraction, PipelineErrorKind::Extraction, err.to_string()))?;
            self.events.progress(
                Stage::Extraction,
                scaled_percent(0, 10, index + 1, total),
                format!("found {} {platform} keys", keys.len()),
            );
            extracted.insert(platform, keys);
        }
        self.run.complete_stage(Stage::Extraction);
        Ok(extracted)
    }

    /// Fetches the backend snapshot for every active locale.
    async fn fetch_snapshot(&self, stage: Stage) -> Result<BackendSnapshot, StageFailure> {
        let locales = self.config.active_locales();
        let backend = self.services.backend.as_ref();
        let project = self.config.project_id.as_str();
        let locales = locales.as_slice();
        self.gateway
            .call(Lane::Backend, move || backend.fetch_snapshot(project, locales))
            .await
            .map_err(|err| gateway_failure(stage, &err))
    }

    /// Computes missing entries and writes the informational report.
    fn reconcile_keys(&mut self, snapshot: &BackendSnapshot) -> Result<Vec<TranslationEntry>, StageFailure> {
        let scope = ReconcileScope {
            supported: &self.config.locales,
            excluded: &self.config.excluded_locales,
            base_locale: &self.config.base_locale,
        };
        let result = reconcile(&self.extracted, snapshot, &scope);
        self.services
            .reports
            .write(&self.config.reports.missing, &result.missing)
            .map_err(|err| report_failure(Stage::Reconciliation, &err))?;
        self.run.summary.missing = result.missing.len();
        self.events.progress(
            Stage::Reconciliation,
            25,
            format!(
                "{} missing entries across {} locales; {} unused keys",
                result.missing.len(),
                scope.target_locales().len(),
                result.unused.len()
            ),
        );
        self.run.complete_stage(Stage::Reconciliation);
        Ok(result.missing)
    }

    /// Applies the first bypassing action plugin, if any.
    ///
    /// A bypass covers the whole key set: entries with a supplied value are
    /// translated by the plugin; the rest are deferred to a later run.
    fn apply_action_plugins(&mut self, missing: Vec<TranslationEntry>) -> Result<Vec<TranslationEntry>, StageFailure> {
        let ctx = ActionContext {
            run_id: &self.run.run_id,
            entries: &missing,
        };
        let result = self
            .plugins
            .dispatch_action(&ctx)
            .map_err(|err| plugin_failure(Stage::ActionPlugins, &err))?;
        let plugin = match result.plugin {
            Some(plugin) if result.bypassed => plugin,
            _ => {
                self.events.progress(Stage::ActionPlugins, 30, "no action plugin bypassed translation");
                self.run.complete_stage(Stage::ActionPlugins);
                return Ok(missing);
            }
        };
        let mut kept = Vec::new();
        let mut deferred = 0usize;
        for mut entry in missing {
            let value = result
                .payload
                .iter()
                .find(|value| value.platform.is_some() && value.matches(&entry))
                .or_else(|| result.payload.iter().find(|value| value.matches(&entry)));
            match value {
                Some(value) => {
                    entry
                        .mark_translated(value.value.clone(), TranslationOrigin::Plugin(plugin.clone()))
                        .map_err(|err| transition_failure(Stage::ActionPlugins, &err))?;
                    kept.push(entry);
                }
                None => deferred += 1,
            }
        }
        self.run.summary.bypassed = kept.len();
        if deferred > 0 {
            warn!(plugin = %plugin, deferred, "bypass left entries without values; deferring them");
        }
        self.events.progress(
            Stage::ActionPlugins,
            30,
            format!("{plugin} bypassed translation: {} values applied, {deferred} deferred", kept.len()),
        );
        self.run.complete_stage(Stage::ActionPlugins);
        Ok(kept)
    }

    /// Emits the cost projection for the entries about to be translated.
    fn estimate_cost(&mut self, entries: &[TranslationEntry]) {
        let estimate = cost::estimate(entries, &self.config.model, self.services.token_counter.as_ref());
        let exceeds = estimate.exceeds(self.config.cost_warning.as_ref());
        if exceeds {
            warn!(model = %estimate.model, cost = %estimate.cost, "estimated cost exceeds warning threshold");
        }
        self.events.estimate(EstimateReport::from_estimate(&estimate, exceeds));
        self.events.progress(
            Stage::CostEstimate,
            32,
            format!("estimated {} tokens for {} entries", estimate.tokens, estimate.entries),
        );
        self.run.complete_stage(Stage::CostEstimate);
    }

    /// Collects the prompt addendum from prompt plugins.
    fn collect_prompt(&mut self) -> Result<String, StageFailure> {
        let scope = ReconcileScope {
            supported: &self.config.locales,
            excluded: &self.config.excluded_locales,
            base_locale: &self.config.base_locale,
        };
        let locales = scope.target_locales();
        let ctx = PromptContext {
            run_id: &self.run.run_id,
            locales: &locales,
        };
        let addendum = self
            .plugins
            .dispatch_prompt(&ctx)
            .map_err(|err| plugin_failure(Stage::PromptPlugins, &err))?;
        self.events.progress(
            Stage::PromptPlugins,
            35,
            format!("prompt addendum of {} characters", addendum.chars().count()),
        );
        self.run.complete_stage(Stage::PromptPlugins);
        Ok(addendum)
    }

    /// Translates `Missing` entries, one concurrent task per locale.
    ///
    /// Results are applied and reported in locale order regardless of the
    /// order tasks finish in.
    async fn translate(&mut self, entries: &mut [TranslationEntry], addendum: String) -> Result<(), StageFailure> {
        let mut pending: BTreeMap<LocaleCode, Vec<LocalizationKey>> = BTreeMap::new();
        for entry in entries.iter().filter(|entry| entry.status == TranslationStatus::Missing) {
            pending.entry(entry.locale.clone()).or_default().push(entry.key.clone());
        }
        if pending.is_empty() {
            self.events.progress(Stage::Translation, 85, "nothing to translate");
            self.run.complete_stage(Stage::Translation);
            return Ok(());
        }

        let addendum: Arc<str> = Arc::from(addendum);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let batch_size = self.config.translation_batch_size;
        let order: Vec<LocaleCode> = pending.keys().cloned().collect();
        let mut tasks = JoinSet::new();
        for (code, keys) in pending {
            let locale = self.supported_locale(&code);
            let batches: Vec<TranslationBatch> = keys
                .chunks(batch_size)
                .map(|chunk| TranslationBatch {
                    locale: locale.clone(),
                    keys: chunk.to_vec(),
                })
                .collect();
            let gateway = Arc::clone(&self.gateway);
            let translator = Arc::clone(&self.services.translator);
            let addendum = Arc::clone(&addendum);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let outcome =
                    translate_locale(&gateway, translator.as_ref(), &addendum, &semaphore, &batches).await;
                (code, outcome)
            });
        }

        let total = order.len();
        let mut buffered: BTreeMap<LocaleCode, BTreeMap<LocalizationKey, String>> = BTreeMap::new();
        let mut next = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let (code, outcome) = joined.map_err(|err| {
                StageFailure::new(Stage::Translation, PipelineErrorKind::Fatal, format!("translation task failed: {err}"))
            })?;
            let values = outcome.map_err(|err| gateway_failure(Stage::Translation, &err))?;
            buffered.insert(code, values);
            while let Some(code) = order.get(next) {
                let Some(values) = buffered.remove(code) else {
                    break;
                };
                let (applied, requested) = apply_translations(entries, code, &values)?;
                self.run.summary.translated += applied;
                next += 1;
                self.events.progress(
                    Stage::Translation,
                    scaled_percent(35, 85, next, total),
                    format!("translated {applied}/{requested} entries for {code}"),
                );
            }
        }
        self.run.complete_stage(Stage::Translation);
        Ok(())
    }

    /// Applies translated values left in an earlier review report.
    ///
    /// A run that stopped at review, or died before upload, leaves its report
    /// behind; entries it already translated are not requested again.
    fn reuse_previous_report(&mut self, entries: &mut [TranslationEntry]) -> Result<(), StageFailure> {
        let report = self.config.reports.review.as_str();
        let reports = self.services.reports.as_ref();
        if !reports.exists(report) {
            return Ok(());
        }
        let previous: BTreeMap<EntryId, TranslationEntry> = reports
            .read(report)
            .map_err(|err| report_failure(Stage::Translation, &err))?
            .into_iter()
            .filter(|row| row.status == TranslationStatus::Translated && row.has_value())
            .map(|row| (row.id(), row))
            .collect();
        let mut reused = 0;
        for entry in entries.iter_mut().filter(|entry| entry.status == TranslationStatus::Missing) {
            let Some(row) = previous.get(&entry.id()) else {
                continue;
            };
            let Some(value) = row.value.as_deref() else {
                continue;
            };
            let origin = row.origin.clone().unwrap_or(TranslationOrigin::Provider);
            entry.mark_translated(value, origin).map_err(|err| transition_failure(Stage::Translation, &err))?;
            reused += 1;
        }
        if reused > 0 {
            info!(run_id = %self.run.run_id, report, reused, "reusing translations from an earlier report");
            self.run.summary.translated += reused;
            self.events.progress(Stage::Translation, 35, format!("reused {reused} translations from {report}"));
        }
        Ok(())
    }

    /// Returns the configured locale for `code`.
    fn supported_locale(&self, code: &LocaleCode) -> SupportedLocale {
        self.config
            .locales
            .iter()
            .find(|locale| &locale.code == code)
            .cloned()
            .unwrap_or_else(|| SupportedLocale::new(code.clone(), code.as_str()))
    }

    /// Writes the review report under a claim.
    fn write_review_report(&mut self, entries: Vec<TranslationEntry>) -> Result<(), StageFailure> {
        let report = self.config.reports.review.as_str();
        let reports = self.services.reports.as_ref();
        reports.claim(report).map_err(|err| report_failure(Stage::ReportWrite, &err))?;
        let written = reports.write(report, &entries);
        let released = reports.release(report);
        written.map_err(|err| report_failure(Stage::ReportWrite, &err))?;
        released.map_err(|err| report_failure(Stage::ReportWrite, &err))?;
        self.run.summary.skipped = count_status(&entries, TranslationStatus::Skipped);
        self.events.progress(
            Stage::ReportWrite,
            100,
            format!("wrote {} entries to {}", entries.len(), self.config.reports.review),
        );
        self.run.pending_review = entries;
        self.run.complete_stage(Stage::ReportWrite);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------------

    /// Parks until the review report is handed back.
    async fn await_review(&mut self) -> Result<(), StageFailure> {
        self.check_cancel(Stage::ReportWrite)?;
        self.enter(PipelineState::AwaitingReview, Stage::ReportWrite)?;
        self.events.checkpoint(Checkpoint::AwaitingReview {
            report: self.config.reports.review.clone(),
            entries: self.run.pending_review.len(),
        });
        info!(run_id = %self.run.run_id, report = %self.config.reports.review, "awaiting review");
        loop {
            let envelope = self.next_command(Stage::ReviewMerge).await?;
            if envelope.command == Command::ResumeUpload {
                self.enter(PipelineState::Running, Stage::ReviewMerge)?;
                let _ = envelope.reply.send(Ok(()));
                break;
            }
            let _ = envelope.reply.send(Err(CommandError::InvalidState {
                command: envelope.command.name(),
                state: PipelineState::AwaitingReview,
            }));
        }
        self.events.start_upload_phase();
        Ok(())
    }

    /// Parks until the operator scopes the deletion.
    async fn await_deletion_decision(
        &mut self,
        candidates: Vec<UnusedKeyCandidate>,
    ) -> Result<Vec<UnusedKeyCandidate>, StageFailure> {
        self.check_cancel(Stage::UnusedKeys)?;
        self.run.pending_deletion = candidates.clone();
        self.enter(PipelineState::AwaitingDeletionDecision, Stage::UnusedKeys)?;
        self.events.checkpoint(Checkpoint::AwaitingDeletionDecision {
            candidates,
        });
        info!(run_id = %self.run.run_id, candidates = self.run.pending_deletion.len(), "awaiting deletion decision");
        loop {
            let envelope = self.next_command(Stage::Deletion).await?;
            let approved = match &envelope.command {
                Command::SkipDeletion => Vec::new(),
                Command::ConfirmDeletion(names) => {
                    let offered: BTreeSet<&str> =
                        self.run.pending_deletion.iter().map(|c| c.key.identifier.as_str()).collect();
                    if let Some(unknown) = names.iter().find(|name| !offered.contains(name.as_str())) {
                        let _ = envelope.reply.send(Err(CommandError::UnknownCandidate(unknown.clone())));
                        continue;
                    }
                    self.run
                        .pending_deletion
                        .iter()
                        .filter(|candidate| names.contains(&candidate.key.identifier))
                        .cloned()
                        .collect()
                }
                Command::ResumeUpload => {
                    let _ = envelope.reply.send(Err(CommandError::InvalidState {
                        command: envelope.command.name(),
                        state: PipelineState::AwaitingDeletionDecision,
                    }));
                    continue;
                }
            };
            self.enter(PipelineState::Running, Stage::Deletion)?;
            let _ = envelope.reply.send(Ok(()));
            return Ok(approved);
        }
    }

    /// Receives the next command; a closed channel abandons the run.
    async fn next_command(&mut self, stage: Stage) -> Result<CommandEnvelope, StageFailure> {
        self.commands.recv().await.ok_or_else(|| {
            StageFailure::new(stage, PipelineErrorKind::Cancelled, "orchestrator dropped while parked at a checkpoint")
        })
    }

    // ------------------------------------------------------------------------
    // Upload phase
    // ------------------------------------------------------------------------

    /// Claims the review report for the merge and upload, releasing it afterwards.
    async fn upload_phase(&mut self) -> Result<(), StageFailure> {
        self.check_cancel(Stage::ReviewMerge)?;
        let review = self.config.reports.review.clone();
        let reports = Arc::clone(&self.services.reports);
        reports.claim(&review).map_err(|err| report_failure(Stage::ReviewMerge, &err))?;
        let outcome = self.merge_and_upload(&review).await;
        let released = reports.release(&review);
        outcome?;
        released.map_err(|err| report_failure(Stage::Upload, &err))
    }

    /// Merges review edits, uploads, and writes the outcome reports.
    async fn merge_and_upload(&mut self, review: &str) -> Result<(), StageFailure> {
        let reports = Arc::clone(&self.services.reports);
        let edited = reports.read(review).map_err(|err| report_failure(Stage::ReviewMerge, &err))?;
        let pending = std::mem::take(&mut self.run.pending_review);
        let (mut entries, ignored) =
            merge_review(pending, edited).map_err(|err| transition_failure(Stage::ReviewMerge, &err))?;
        if ignored > 0 {
            warn!(report = %review, ignored, "review rows not produced by this run were ignored");
        }
        let ready = entries.iter().filter(|entry| entry.is_uploadable()).count();
        self.events.progress(Stage::ReviewMerge, 10, format!("merged review edits; {ready} entries ready to upload"));
        self.run.complete_stage(Stage::ReviewMerge);

        self.check_cancel(Stage::Upload)?;
        let failed = self.upload(&mut entries).await?;

        let uploaded: Vec<TranslationEntry> =
            entries.iter().filter(|entry| entry.status == TranslationStatus::Uploaded).cloned().collect();
        reports
            .write(&self.config.reports.uploaded, &uploaded)
            .map_err(|err| report_failure(Stage::Upload, &err))?;
        if !failed.is_empty() {
            reports
                .write(&self.config.reports.failed, &failed)
                .map_err(|err| report_failure(Stage::Upload, &err))?;
        }

        self.run.summary.uploaded = uploaded.len();
        self.run.summary.failed_uploads = failed.len();
        self.run.summary.skipped = count_status(&entries, TranslationStatus::Skipped);
        self.run.pending_review = entries;
        self.run.complete_stage(Stage::Upload);
        Ok(())
    }

    /// Uploads uploadable entries in batches; returns the rejected ones.
    async fn upload(&mut self, entries: &mut [TranslationEntry]) -> Result<Vec<TranslationEntry>, StageFailure> {
        let uploadable: Vec<TranslationEntry> = entries.iter().filter(|e| e.is_uploadable()).cloned().collect();
        if uploadable.is_empty() {
            self.events.progress(Stage::Upload, 80, "nothing to upload");
            return Ok(Vec::new());
        }
        let index: BTreeMap<EntryId, usize> =
            entries.iter().enumerate().map(|(position, entry)| (entry.id(), position)).collect();
        let batches: Vec<&[TranslationEntry]> = uploadable.chunks(self.config.upload_batch_size).collect();
        let total = batches.len();
        let mut failed = Vec::new();
        for (number, batch) in batches.into_iter().enumerate() {
            let outcome = {
                let backend = self.services.backend.as_ref();
                let project = self.config.project_id.as_str();
                self.gateway
                    .call(Lane::Backend, move || backend.upload(project, batch))
                    .await
                    .map_err(|err| gateway_failure(Stage::Upload, &err))?
            };
            for id in &outcome.accepted {
                if let Some(entry) = index.get(id).and_then(|position| entries.get_mut(*position)) {
                    entry.mark_uploaded().map_err(|err| transition_failure(Stage::Upload, &err))?;
                }
            }
            for rejection in &outcome.rejected {
                warn!(entry = %rejection.entry, reason = %rejection.reason, "backend rejected entry");
                if let Some(entry) = index.get(&rejection.entry).and_then(|position| entries.get(*position)) {
                    failed.push(entry.clone());
                }
            }
            self.events.progress(
                Stage::Upload,
                scaled_percent(10, 80, number + 1, total),
                format!(
                    "uploaded batch {}/{total}: {} accepted, {} rejected",
                    number + 1,
                    outcome.accepted.len(),
                    outcome.rejected.len()
                ),
            );
        }
        Ok(failed)
    }

    /// Re-reads the backend and computes deletion candidates.
    async fn find_unused_keys(&mut self) -> Result<Vec<UnusedKeyCandidate>, StageFailure> {
        self.check_cancel(Stage::UnusedKeys)?;
        let snapshot = self.fetch_snapshot(Stage::UnusedKeys).await?;
        let candidates = unused_keys(&self.extracted, &snapshot, &self.config.base_locale);
        self.run.summary.candidates = candidates.len();
        let percent = if candidates.is_empty() { 100 } else { 90 };
        self.events.progress(Stage::UnusedKeys, percent, format!("{} unused keys", candidates.len()));
        self.run.complete_stage(Stage::UnusedKeys);
        Ok(candidates)
    }

    /// Deletes exactly the approved candidates in one backend call.
    async fn delete_keys(&mut self, approved: Vec<UnusedKeyCandidate>) -> Result<(), StageFailure> {
        if approved.is_empty() {
            self.events.progress(Stage::Deletion, 100, "no keys deleted");
            self.run.complete_stage(Stage::Deletion);
            return Ok(());
        }
        self.check_cancel(Stage::Deletion)?;
        let ids: Vec<BackendId> = approved.iter().map(|candidate| candidate.backend_id.clone()).collect();
        {
            let backend = self.services.backend.as_ref();
            let project = self.config.project_id.as_str();
            let ids = ids.as_slice();
            self.gateway
                .call(Lane::Backend, move || backend.delete(project, ids))
                .await
                .map_err(|err| gateway_failure(Stage::Deletion, &err))?;
        }
        self.run.summary.deleted = ids.len();
        info!(run_id = %self.run.run_id, deleted = ids.len(), "deleted unused keys");
        self.events.progress(Stage::Deletion, 100, format!("deleted {} keys", ids.len()));
        self.run.complete_stage(Stage::Deletion);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // State helpers
    // ------------------------------------------------------------------------

    /// Moves the run to `next` and publishes it.
    fn enter(&mut self, next: PipelineState, stage: Stage) -> Result<(), StageFailure> {
        self.run
            .transition(next)
            .map_err(|err| StageFailure::new(stage, PipelineErrorKind::Fatal, err.to_string()))?;
        self.state.send_replace(next);
        Ok(())
    }

    /// Fails with `Cancelled` when cancellation was requested.
    fn check_cancel(&self, stage: Stage) -> Result<(), StageFailure> {
        self.stage.send_replace(stage);
        if self.cancel.load(Ordering::Acquire) {
            return Err(StageFailure::new(stage, PipelineErrorKind::Cancelled, "run cancelled"));
        }
        Ok(())
    }

    /// Moves the run to `Error` and reports the failure.
    fn fail(&mut self, failure: StageFailure) {
        error!(
            run_id = %self.run.run_id,
            stage = failure.stage.as_str(),
            kind = failure.kind.as_str(),
            message = %failure.message,
            "pipeline run failed"
        );
        if self.run.transition(PipelineState::Error).is_ok() {
            self.state.send_replace(PipelineState::Error);
        }
        self.events.error(&failure);
        self.run.failure = Some(failure);
    }
}

// ============================================================================
// SECTION: Supervision
// ============================================================================

/// Handles the supervisor keeps for a worker it drives.
pub(crate) struct Supervision {
    /// Run record as it was when the worker started.
    pub(crate) run: PipelineRun,
    /// Publisher of the run state, shared with the worker.
    pub(crate) state: watch::Sender<PipelineState>,
    /// Stage the worker most recently entered.
    pub(crate) stage: watch::Receiver<Stage>,
    /// Event producer sharing the worker's sequence.
    pub(crate) events: EventEmitter,
}

/// Drives a worker on its own task and fails the run if that task dies.
///
/// A panic anywhere in the worker (a compiled-in plugin, a collaborator)
/// still leaves the run in `Error` with an `error` event, so the run slot
/// can be reused.
pub(crate) async fn supervise(worker: Worker, supervision: Supervision) -> PipelineRun {
    let Supervision {
        mut run,
        state,
        stage,
        events,
    } = supervision;
    let err = match tokio::spawn(worker.drive()).await {
        Ok(run) => return run,
        Err(err) => err,
    };
    let stage = *stage.borrow();
    let kind = if stage.is_plugin_dispatch() { PipelineErrorKind::PluginExecution } else { PipelineErrorKind::Fatal };
    let failure = StageFailure::new(stage, kind, format!("pipeline worker stopped: {err}"));
    error!(
        run_id = %run.run_id,
        stage = failure.stage.as_str(),
        kind = failure.kind.as_str(),
        message = %failure.message,
        "pipeline worker died"
    );
    if run.transition(PipelineState::Error).is_ok() {
        state.send_replace(PipelineState::Error);
    }
    events.error(&failure);
    run.failure = Some(failure);
    run
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Translates every batch for one locale under a concurrency permit.
async fn translate_locale(
    gateway: &Gateway,
    translator: &dyn TranslationProvider,
    addendum: &str,
    semaphore: &Semaphore,
    batches: &[TranslationBatch],
) -> Result<BTreeMap<LocalizationKey, String>, GatewayError> {
    let _permit = semaphore.acquire().await.map_err(|_| GatewayError::Fatal {
        attempts: 0,
        message: "translation concurrency limiter closed".to_string(),
    })?;
    let mut translated = BTreeMap::new();
    for batch in batches {
        let values = gateway.call(Lane::Translation, move || translator.translate(batch, addendum)).await?;
        translated.extend(values);
    }
    Ok(translated)
}

/// Applies provider values to the `Missing` entries of one locale.
///
/// Returns `(applied, requested)`.
fn apply_translations(
    entries: &mut [TranslationEntry],
    code: &LocaleCode,
    values: &BTreeMap<LocalizationKey, String>,
) -> Result<(usize, usize), StageFailure> {
    let mut applied = 0usize;
    let mut requested = 0usize;
    for entry in entries
        .iter_mut()
        .filter(|entry| &entry.locale == code && entry.status == TranslationStatus::Missing)
    {
        requested += 1;
        match values.get(&entry.key) {
            Some(value) => {
                entry
                    .mark_translated(value.clone(), TranslationOrigin::Provider)
                    .map_err(|err| transition_failure(Stage::Translation, &err))?;
                applied += 1;
            }
            None => warn!(entry = %entry.id(), "provider returned no value; entry stays missing"),
        }
    }
    Ok((applied, requested))
}

/// Marks entries whose base value is blank as translated to an empty value.
fn mark_empty_sources(entries: &mut [TranslationEntry]) -> Result<(), StatusTransitionError> {
    for entry in entries
        .iter_mut()
        .filter(|entry| entry.status == TranslationStatus::Missing && entry.key.base_value.trim().is_empty())
    {
        entry.mark_translated(String::new(), TranslationOrigin::EmptySource)?;
    }
    Ok(())
}

/// Merges the reviewed report into the entries produced by this run.
///
/// Rules, per entry:
/// - a row marked `skipped` skips the entry;
/// - a row with a different non-blank value makes it a manual translation;
/// - a row whose value was blanked skips an entry that had a value;
/// - a removed row skips the entry;
/// - a skipped entry stays skipped.
///
/// Rows that match no entry are ignored and counted.
///
/// # Errors
///
/// Returns [`StatusTransitionError`] when a merge would make an illegal transition.
pub(crate) fn merge_review(
    pending: Vec<TranslationEntry>,
    edited: Vec<TranslationEntry>,
) -> Result<(Vec<TranslationEntry>, usize), StatusTransitionError> {
    let mut rows: BTreeMap<EntryId, TranslationEntry> = edited.into_iter().map(|row| (row.id(), row)).collect();
    let mut merged = Vec::with_capacity(pending.len());
    for mut entry in pending {
        let row = rows.remove(&entry.id());
        if entry.status == TranslationStatus::Skipped {
            merged.push(entry);
            continue;
        }
        match row {
            None => entry.mark_skipped()?,
            Some(row) if row.status == TranslationStatus::Skipped => entry.mark_skipped()?,
            Some(row) => match row.value.filter(|value| !value.trim().is_empty()) {
                Some(value) if entry.value.as_deref() != Some(value.as_str()) => {
                    entry.mark_translated(value, TranslationOrigin::Manual)?;
                }
                Some(_) => {}
                None if entry.has_value() => entry.mark_skipped()?,
                None => {}
            },
        }
        merged.push(entry);
    }
    Ok((merged, rows.len()))
}

/// Counts entries with `status`.
fn count_status(entries: &[TranslationEntry], status: TranslationStatus) -> usize {
    entries.iter().filter(|entry| entry.status == status).count()
}

/// Maps `done/total` onto the `start ..= end` percent range.
fn scaled_percent(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = usize::from(end.saturating_sub(start));
    let offset = span.saturating_mul(done.min(total)) / total;
    start.saturating_add(u8::try_from(offset).unwrap_or(u8::MAX)).min(end)
}

/// Classifies a gateway failure.
fn gateway_failure(stage: Stage, err: &GatewayError) -> StageFailure {
    StageFailure::new(stage, err.kind(), err.to_string())
}

/// Classifies a plugin failure.
fn plugin_failure(stage: Stage, err: &PluginExecutionError) -> StageFailure {
    StageFailure::new(stage, PipelineErrorKind::PluginExecution, err.to_string())
}

/// Classifies a report store failure.
fn report_failure(stage: Stage, err: &ReportError) -> StageFailure {
    StageFailure::new(stage, PipelineErrorKind::ReportIo, err.to_string())
}

/// Classifies an illegal entry transition.
fn transition_failure(stage: Stage, err: &StatusTransitionError) -> StageFailure {
    StageFailure::new(stage, PipelineErrorKind::Fatal, err.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test assertions use unwrap for clarity.")]

    use super::merge_review;
    use super::scaled_percent;
    use crate::core::LocaleCode;
    use crate::core::LocalizationKey;
    use crate::core::Platform;
    use crate::core::TranslationEntry;
    use crate::core::TranslationOrigin;
    use crate::core::TranslationStatus;

    fn translated(identifier: &str, value: &str) -> TranslationEntry {
        let key = LocalizationKey::new(identifier, Platform::Ios, "Hello");
        let mut entry = TranslationEntry::missing(key, LocaleCode::new("de"), None);
        entry.mark_translated(value, TranslationOrigin::Provider).unwrap();
        entry
    }

    #[test]
    fn edited_value_becomes_manual_translation() {
        let pending = vec![translated("greeting", "Hallo")];
        let mut row = pending[0].clone();
        row.value = Some("Servus".to_string());
        let (merged, ignored) = merge_review(pending, vec![row]).unwrap();
        assert_eq!(ignored, 0);
        assert_eq!(merged[0].value.as_deref(), Some("Servus"));
        assert_eq!(merged[0].origin, Some(TranslationOrigin::Manual));
        assert_eq!(merged[0].status, TranslationStatus::Translated);
    }

    #[test]
    fn removed_and_skipped_rows_skip_entries() {
        let pending = vec![translated("a", "A"), translated("b", "B"), translated("c", "C")];
        let mut skipped = pending[1].clone();
        skipped.status = TranslationStatus::Skipped;
        let kept = pending[2].clone();
        let (merged, _) = merge_review(pending, vec![skipped, kept]).unwrap();
        let statuses: Vec<_> = merged.iter().map(|entry| entry.status).collect();
        assert_eq!(
            statuses,
            vec![TranslationStatus::Skipped, TranslationStatus::Skipped, TranslationStatus::Translated]
        );
    }

    #[test]
    fn foreign_rows_are_ignored() {
        let pending = vec![translated("a", "A")];
        let rows = vec![pending[0].clone(), translated("zzz", "Z")];
        let (merged, ignored) = merge_review(pending, rows).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(ignored, 1);
    }

    #[test]
    fn skipped_entries_never_revert() {
        let mut entry = translated("a", "A");
        entry.mark_skipped().unwrap();
        let mut row = entry.clone();
        row.status = TranslationStatus::Translated;
        row.value = Some("Anders".to_string());
        let (merged, _) = merge_review(vec![entry], vec![row]).unwrap();
        assert_eq!(merged[0].status, TranslationStatus::Skipped);
    }

    #[test]
    fn scaled_percent_stays_in_range() {
        assert_eq!(scaled_percent(35, 85, 0, 4), 35);
        assert_eq!(scaled_percent(35, 85, 2, 4), 60);
        assert_eq!(scaled_percent(35, 85, 4, 4), 85);
        assert_eq!(scaled_percent(10, 80, 9, 4), 80);
        assert_eq!(scaled_percent(10, 80, 0, 0), 80);
    }
}
