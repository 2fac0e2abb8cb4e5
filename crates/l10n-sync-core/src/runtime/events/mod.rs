// crates/l10n-sync-core/src/runtime/events/mod.rs
// ============================================================================
// Module: L10n Sync Pipeline Events
// Description: Progress, checkpoint, completion, and error events with delivery sinks.
// Purpose: Give external observers the only view of pipeline state.
// Dependencies: serde, thiserror, tracing, crate::core
// ============================================================================

//! ## Overview
//! The orchestrator worker is the only producer of [`PipelineEvent`] values.
//! Each event carries a per-run sequence number that strictly increases, and
//! every registered [`EventSink`] receives events in that order.
//! Invariants:
//! - Progress percent never decreases within a phase; it resets to zero only
//!   when the upload phase starts.
//! - A sink failure is logged and never aborts the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::core::PipelineErrorKind;
use crate::core::RunId;
use crate::core::RunSummary;
use crate::core::Stage;
use crate::core::StageFailure;
use crate::core::UnusedKeyCandidate;
use crate::runtime::cost::CostEstimate;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Cost projection as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateReport {
    /// Model priced.
    pub model: String,
    /// Entries counted.
    pub entries: usize,
    /// Projected total tokens.
    pub tokens: u64,
    /// Projected cost in USD as a decimal string.
    pub cost: String,
    /// True when the configured warning threshold is exceeded.
    pub exceeds_warning: bool,
}

impl EstimateReport {
    /// Builds a report from an estimate.
    #[must_use]
    pub fn from_estimate(estimate: &CostEstimate, exceeds_warning: bool) -> Self {
        Self {
            model: estimate.model.clone(),
            entries: estimate.entries,
            tokens: estimate.tokens,
            cost: estimate.cost.to_string(),
            exceeds_warning,
        }
    }
}

/// Human checkpoint the run is parked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "checkpoint", rename_all = "snake_case")]
pub enum Checkpoint {
    /// The review report is ready for editing.
    AwaitingReview {
        /// Report name in the report store.
        report: String,
        /// Entries written to the report.
        entries: usize,
    },
    /// Unused keys await a scoped deletion decision.
    AwaitingDeletionDecision {
        /// Deletion candidates offered.
        candidates: Vec<UnusedKeyCandidate>,
    },
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    /// A unit of work finished.
    Progress {
        /// Stage that made progress.
        stage: Stage,
        /// Phase completion percentage.
        percent: u8,
        /// Human-readable detail.
        message: String,
    },
    /// Cost projection before translation.
    Estimate(EstimateReport),
    /// The run parked at a checkpoint.
    Checkpoint(Checkpoint),
    /// The run finished.
    Completed {
        /// Run counters.
        summary: RunSummary,
    },
    /// The run was abandoned.
    Error {
        /// Failing stage.
        stage: Stage,
        /// Failure classification.
        kind: PipelineErrorKind,
        /// Failure detail.
        message: String,
    },
}

/// Event emitted by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Run that emitted the event.
    pub run_id: RunId,
    /// Per-run sequence number starting at 1.
    pub seq: u64,
    /// Event payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Errors emitted by event sinks.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Event delivery failed.
    #[error("event delivery failed: {0}")]
    DeliveryFailed(String),
    /// Log sink failed to write.
    #[error("event log write failed: {0}")]
    LogWriteFailed(String),
    /// The receiving side is gone; the sink is dropped from its registry.
    #[error("event sink closed")]
    Closed,
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when delivery fails.
    fn deliver(&self, event: &PipelineEvent) -> Result<(), SinkError>;
}

/// Shared, growable list of sinks.
#[derive(Clone, Default)]
pub struct SinkRegistry {
    /// Registered sinks in registration order.
    sinks: Arc<Mutex<Vec<Arc<dyn EventSink>>>>,
}

impl SinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink for all subsequent events.
    pub fn register(&self, sink: Arc<dyn EventSink>) {
        match self.sinks.lock() {
            Ok(mut guard) => guard.push(sink),
            Err(_) => warn!("event sink registry mutex poisoned; sink not registered"),
        }
    }

    /// Returns the number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.lock().map_or(0, |guard| guard.len())
    }

    /// Returns true when no sink is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers an event to every sink, logging failures.
    ///
    /// Sinks reporting [`SinkError::Closed`] are unregistered.
    pub fn publish(&self, event: &PipelineEvent) {
        let sinks = match self.sinks.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                warn!("event sink registry mutex poisoned; event dropped");
                return;
            }
        };
        let mut closed = Vec::new();
        for sink in sinks {
            match sink.deliver(event) {
                Ok(()) => {}
                Err(SinkError::Closed) => closed.push(sink),
                Err(err) => {
                    warn!(run_id = %event.run_id, seq = event.seq, error = %err, "event sink delivery failed");
                }
            }
        }
        if closed.is_empty() {
            return;
        }
        if let Ok(mut guard) = self.sinks.lock() {
            guard.retain(|sink| !closed.iter().any(|gone| Arc::ptr_eq(gone, sink)));
            debug!(run_id = %event.run_id, dropped = closed.len(), "closed event sinks unregistered");
        }
    }
}

// ============================================================================
// SECTION: Emitter
// ============================================================================

/// Monotonic percent tracker for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    /// Highest percent reported in the current phase.
    current: u8,
}

impl ProgressTracker {
    /// Records `percent` and returns the value to report (never lower than before).
    pub fn advance(&mut self, percent: u8) -> u8 {
        self.current = self.current.max(percent.min(100));
        self.current
    }

    /// Starts a new phase at zero.
    pub const fn reset(&mut self) {
        self.current = 0;
    }

    /// Returns the current percent.
    #[must_use]
    pub const fn current(&self) -> u8 {
        self.current
    }
}

/// Per-run event producer owned by the orchestrator worker.
///
/// # Invariants
/// - Clones share one sequence counter; progress tracking is per clone.
#[derive(Clone)]
pub struct EventEmitter {
    /// Run identifier stamped on every event.
    run_id: RunId,
    /// Last sequence number issued.
    seq: Arc<AtomicU64>,
    /// Progress tracker for the current phase.
    progress: ProgressTracker,
    /// Destination sinks.
    sinks: SinkRegistry,
}

impl EventEmitter {
    /// Creates an emitter for a run.
    #[must_use]
    pub fn new(run_id: RunId, sinks: SinkRegistry) -> Self {
        Self {
            run_id,
            seq: Arc::new(AtomicU64::new(0)),
            progress: ProgressTracker::default(),
            sinks,
        }
    }

    /// Emits a progress event; `percent` is clamped to stay monotonic.
    pub fn progress(&mut self, stage: Stage, percent: u8, message: impl Into<String>) {
        let percent = self.progress.advance(percent);
        self.emit(EventKind::Progress {
            stage,
            percent,
            message: message.into(),
        });
    }

    /// Starts the upload phase, resetting progress to zero.
    pub const fn start_upload_phase(&mut self) {
        self.progress.reset();
    }

    /// Emits a cost estimate.
    pub fn estimate(&self, report: EstimateReport) {
        self.emit(EventKind::Estimate(report));
    }

    /// Emits a checkpoint.
    pub fn checkpoint(&self, checkpoint: Checkpoint) {
        self.emit(EventKind::Checkpoint(checkpoint));
    }

    /// Emits completion.
    pub fn completed(&self, summary: RunSummary) {
        self.emit(EventKind::Completed {
            summary,
        });
    }

    /// Emits a classified failure.
    pub fn error(&self, failure: &StageFailure) {
        self.emit(EventKind::Error {
            stage: failure.stage,
            kind: failure.kind,
            message: failure.message.clone(),
        });
    }

    /// Stamps and publishes an event.
    fn emit(&self, kind: EventKind) {
        let seq = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        let event = PipelineEvent {
            run_id: self.run_id.clone(),
            seq,
            kind,
        };
        self.sinks.publish(&event);
    }
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod callback;
pub mod channel;
pub mod log;

pub use callback::CallbackSink;
pub use channel::ChannelSink;
pub use log::LogSink;
