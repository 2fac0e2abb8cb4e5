// crates/l10n-sync-core/src/core/state.rs
// ============================================================================
// Module: L10n Sync Pipeline State
// Description: Pipeline states, stages, failure classification, and the run aggregate.
// Purpose: Encode the workflow state machine and its legal transitions.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`PipelineRun`] is the aggregate root owned by the orchestrator worker. Its
//! state only moves along the edges accepted by [`PipelineState::can_transition`]:
//! `Idle → Running`, `Running` to either checkpoint, checkpoints back to
//! `Running`, `Running → Completed`, any non-terminal state to `Error`, and the
//! terminal states back to `Idle`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::RunId;
use crate::core::time::Timestamp;
use crate::core::translation::TranslationEntry;
use crate::core::translation::UnusedKeyCandidate;

// ============================================================================
// SECTION: States and Stages
// ============================================================================

/// Workflow state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No run is in progress.
    Idle,
    /// Stages are executing.
    Running,
    /// Parked until the reviewer resumes the upload.
    AwaitingReview,
    /// Parked until the operator decides which unused keys to delete.
    AwaitingDeletionDecision,
    /// The run finished.
    Completed,
    /// The run was abandoned after a stage failure.
    Error,
}

impl PipelineState {
    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::AwaitingReview => "awaiting_review",
            Self::AwaitingDeletionDecision => "awaiting_deletion_decision",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Returns true while a run occupies the single active-run slot.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::AwaitingReview | Self::AwaitingDeletionDecision)
    }

    /// Returns true for `Completed` and `Error`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns true when `self → next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (
                    Self::Running,
                    Self::AwaitingReview | Self::AwaitingDeletionDecision | Self::Completed
                )
                | (Self::AwaitingReview | Self::AwaitingDeletionDecision, Self::Running)
                | (
                    Self::Running | Self::AwaitingReview | Self::AwaitingDeletionDecision,
                    Self::Error
                )
                | (Self::Completed | Self::Error, Self::Idle)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete stage of the pipeline, used for progress and failure reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Configuration and credential checks before any stage runs.
    Setup,
    /// Source key extraction.
    Extraction,
    /// Backend snapshot fetch.
    Snapshot,
    /// Missing/unused key computation.
    Reconciliation,
    /// Action plugin dispatch.
    ActionPlugins,
    /// Cost projection.
    CostEstimate,
    /// Prompt plugin dispatch.
    PromptPlugins,
    /// Machine translation.
    Translation,
    /// Extension plugin dispatch.
    ExtensionPlugins,
    /// Review report write.
    ReportWrite,
    /// Reviewer edits merged back from the report.
    ReviewMerge,
    /// Backend upload.
    Upload,
    /// Unused-key recomputation after upload.
    UnusedKeys,
    /// Backend key deletion.
    Deletion,
}

impl Stage {
    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Extraction => "extraction",
            Self::Snapshot => "snapshot",
            Self::Reconciliation => "reconciliation",
            Self::ActionPlugins => "action_plugins",
            Self::CostEstimate => "cost_estimate",
            Self::PromptPlugins => "prompt_plugins",
            Self::Translation => "translation",
            Self::ExtensionPlugins => "extension_plugins",
            Self::ReportWrite => "report_write",
            Self::ReviewMerge => "review_merge",
            Self::Upload => "upload",
            Self::UnusedKeys => "unused_keys",
            Self::Deletion => "deletion",
        }
    }

    /// Returns true for the stages that dispatch plugins.
    #[must_use]
    pub const fn is_plugin_dispatch(self) -> bool {
        matches!(self, Self::ActionPlugins | Self::PromptPlugins | Self::ExtensionPlugins)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Classification attached to a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    /// Missing or invalid configuration or credentials.
    Configuration,
    /// Source scan failure.
    Extraction,
    /// Rate limit persisted past the retry bound.
    RateLimited,
    /// Transient failure persisted past the retry bound.
    Transient,
    /// Non-retryable downstream failure.
    Fatal,
    /// A plugin failed during dispatch.
    PluginExecution,
    /// Report store unreadable or unwritable.
    ReportIo,
    /// The run was cancelled at a stage boundary.
    Cancelled,
}

impl PipelineErrorKind {
    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Extraction => "extraction",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient",
            Self::Fatal => "fatal",
            Self::PluginExecution => "plugin_execution",
            Self::ReportIo => "report_io",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure of one stage; the run is abandoned when one occurs.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{stage} failed ({kind}): {message}")]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Failure classification.
    pub kind: PipelineErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl StageFailure {
    /// Creates a stage failure.
    #[must_use]
    pub fn new(stage: Stage, kind: PipelineErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

/// Rejected pipeline state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal pipeline transition: {from} -> {to}")]
pub struct StateTransitionError {
    /// State before the attempted change.
    pub from: PipelineState,
    /// Requested state.
    pub to: PipelineState,
}

// ============================================================================
// SECTION: Run Aggregate
// ============================================================================

/// Counters reported when a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Entries reconciled as missing.
    pub missing: usize,
    /// Entries translated by the provider.
    pub translated: usize,
    /// Entries filled by an action plugin bypass.
    pub bypassed: usize,
    /// Entries skipped by plugins or reviewers.
    pub skipped: usize,
    /// Entries written to the backend.
    pub uploaded: usize,
    /// Entries the backend rejected.
    pub failed_uploads: usize,
    /// Unused keys offered for deletion.
    pub candidates: usize,
    /// Unused keys deleted.
    pub deleted: usize,
}

/// The single active pipeline run.
///
/// # Invariants
/// - Only the orchestrator worker mutates a run.
/// - `state` changes only through [`PipelineRun::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Run identifier.
    pub run_id: RunId,
    /// Current workflow state.
    pub state: PipelineState,
    /// Wall-clock start time.
    pub started_at: Timestamp,
    /// Stages completed so far, in order.
    pub stages_completed: Vec<Stage>,
    /// Entries awaiting or carried through review.
    pub pending_review: Vec<TranslationEntry>,
    /// Unused keys awaiting a deletion decision.
    pub pending_deletion: Vec<UnusedKeyCandidate>,
    /// Failure that ended the run, if any.
    pub failure: Option<StageFailure>,
    /// Running counters.
    pub summary: RunSummary,
}

impl PipelineRun {
    /// Creates an idle run record.
    #[must_use]
    pub const fn new(run_id: RunId, started_at: Timestamp) -> Self {
        Self {
            run_id,
            state: PipelineState::Idle,
            started_at,
            stages_completed: Vec::new(),
            pending_review: Vec::new(),
            pending_deletion: Vec::new(),
            failure: None,
            summary: RunSummary {
                missing: 0,
                translated: 0,
                bypassed: 0,
                skipped: 0,
                uploaded: 0,
                failed_uploads: 0,
                candidates: 0,
                deleted: 0,
            },
        }
    }

    /// Moves the run to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`StateTransitionError`] when `next` is not reachable from the current state.
    pub fn transition(&mut self, next: PipelineState) -> Result<(), StateTransitionError> {
        if !self.state.can_transition(next) {
            return Err(StateTransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Records a completed stage.
    pub fn complete_stage(&mut self, stage: Stage) {
        self.stages_completed.push(stage);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::PipelineState;

    #[test]
    fn terminal_states_only_return_to_idle() {
        for next in [
            PipelineState::Running,
            PipelineState::AwaitingReview,
            PipelineState::AwaitingDeletionDecision,
            PipelineState::Error,
        ] {
            assert!(!PipelineState::Completed.can_transition(next));
            assert!(!PipelineState::Error.can_transition(next));
        }
        assert!(PipelineState::Completed.can_transition(PipelineState::Idle));
        assert!(PipelineState::Error.can_transition(PipelineState::Idle));
    }

    #[test]
    fn checkpoints_cannot_complete_directly() {
        assert!(!PipelineState::AwaitingReview.can_transition(PipelineState::Completed));
        assert!(!PipelineState::AwaitingDeletionDecision.can_transition(PipelineState::Completed));
        assert!(!PipelineState::Idle.can_transition(PipelineState::AwaitingReview));
    }
}
