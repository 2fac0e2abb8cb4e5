// crates/l10n-sync-cli/src/render.rs
// ============================================================================
// Module: Event Rendering
// Description: Formats pipeline events and summaries as terminal lines.
// Purpose: Keep the run transcript stable and testable.
// Dependencies: l10n-sync-core
// ============================================================================

//! ## Overview
//! Every [`PipelineEvent`] renders to exactly one line so the run transcript
//! mirrors the event order. Deletion candidates render one per line below
//! the checkpoint line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use l10n_sync_core::RunSummary;
use l10n_sync_core::UnusedKeyCandidate;
use l10n_sync_core::runtime::Checkpoint;
use l10n_sync_core::runtime::EstimateReport;
use l10n_sync_core::runtime::EventKind;
use l10n_sync_core::runtime::PipelineEvent;

use crate::t;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders one event as a single line.
#[must_use]
pub fn render_event(event: &PipelineEvent) -> String {
    match &event.kind {
        EventKind::Progress {
            stage,
            percent,
            message,
        } => t!("event.progress", percent = format!("{percent:>3}"), stage = stage, message = message),
        EventKind::Estimate(report) => render_estimate(report),
        EventKind::Checkpoint(Checkpoint::AwaitingReview {
            report,
            entries,
        }) => t!("event.review", entries = entries, report = report),
        EventKind::Checkpoint(Checkpoint::AwaitingDeletionDecision {
            candidates,
        }) => t!("event.deletion", count = candidates.len()),
        EventKind::Completed {
            summary,
        } => render_summary(summary),
        EventKind::Error {
            stage,
            kind,
            message,
        } => t!("event.error", stage = stage, kind = kind, message = message),
    }
}

/// Renders a cost projection.
#[must_use]
pub fn render_estimate(report: &EstimateReport) -> String {
    let line = t!(
        "event.estimate",
        entries = report.entries,
        tokens = report.tokens,
        model = report.model,
        cost = report.cost
    );
    if report.exceeds_warning { format!("{line} {}", t!("event.estimate.over_threshold")) } else { line }
}

/// Renders the final run counters.
#[must_use]
pub fn render_summary(summary: &RunSummary) -> String {
    t!(
        "event.completed",
        missing = summary.missing,
        translated = summary.translated,
        bypassed = summary.bypassed,
        skipped = summary.skipped,
        uploaded = summary.uploaded,
        failed = summary.failed_uploads,
        deleted = summary.deleted,
        candidates = summary.candidates
    )
}

/// Renders deletion candidates, one per line.
#[must_use]
pub fn render_candidates(candidates: &[UnusedKeyCandidate]) -> Vec<String> {
    candidates
        .iter()
        .map(|candidate| {
            t!(
                "deletion.candidate",
                name = candidate.key.identifier,
                platform = candidate.key.platform,
                value = candidate.key.base_value
            )
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use l10n_sync_core::BackendId;
    use l10n_sync_core::LocalizationKey;
    use l10n_sync_core::PipelineErrorKind;
    use l10n_sync_core::Platform;
    use l10n_sync_core::RunId;
    use l10n_sync_core::RunSummary;
    use l10n_sync_core::Stage;
    use l10n_sync_core::UnusedKeyCandidate;
    use l10n_sync_core::runtime::EstimateReport;
    use l10n_sync_core::runtime::EventKind;
    use l10n_sync_core::runtime::PipelineEvent;

    use super::render_candidates;
    use super::render_event;
    use super::render_summary;

    fn event(kind: EventKind) -> PipelineEvent {
        PipelineEvent {
            run_id: RunId::new("run-1"),
            seq: 1,
            kind,
        }
    }

    #[test]
    fn progress_and_errors_render_stage_labels() {
        let progress = event(EventKind::Progress {
            stage: Stage::Translation,
            percent: 7,
            message: "de: 20 entries".to_string(),
        });
        assert_eq!(render_event(&progress), "[  7%] translation: de: 20 entries");

        let failure = event(EventKind::Error {
            stage: Stage::Snapshot,
            kind: PipelineErrorKind::RateLimited,
            message: "rate limited after 6 attempts".to_string(),
        });
        assert_eq!(render_event(&failure), "error in snapshot (rate_limited): rate limited after 6 attempts");
    }

    #[test]
    fn estimates_flag_the_threshold() {
        let report = EstimateReport {
            model: "gpt-4o-mini".to_string(),
            entries: 40,
            tokens: 1_200,
            cost: "0.0012".to_string(),
            exceeds_warning: true,
        };
        let line = render_event(&event(EventKind::Estimate(report)));
        assert!(line.starts_with("estimate: 40 entries, 1200 tokens on gpt-4o-mini, about $0.0012"));
        assert!(line.ends_with("(above the configured warning threshold)"));
    }

    #[test]
    fn summaries_and_candidates() {
        let summary = RunSummary {
            missing: 5,
            translated: 3,
            bypassed: 1,
            skipped: 1,
            uploaded: 4,
            failed_uploads: 0,
            candidates: 2,
            deleted: 1,
        };
        assert_eq!(
            render_summary(&summary),
            "completed: 5 missing, 3 translated, 1 from plugins, 1 skipped, 4 uploaded, 0 rejected, 1 of 2 unused \
             keys deleted"
        );

        let candidates = vec![UnusedKeyCandidate {
            key: LocalizationKey::new("old_banner", Platform::Android, "Sale!"),
            backend_id: BackendId::new("9"),
        }];
        assert_eq!(render_candidates(&candidates), vec!["  old_banner (android) \"Sale!\"".to_string()]);
    }
}
