// crates/l10n-sync-core/src/core/mod.rs
// ============================================================================
// Module: L10n Sync Core Types
// Description: Canonical localization records and pipeline run-state structures.
// Purpose: Provide stable, serializable types shared by every stage and collaborator.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! Core types describe localization keys, translation entries, backend
//! snapshots, and the pipeline run aggregate. Collaborator crates and the
//! presentation layer exchange only these types with the runtime.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod snapshot;
pub mod state;
pub mod time;
pub mod translation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::BackendId;
pub use identifiers::LocaleCode;
pub use identifiers::PluginName;
pub use identifiers::RunId;
pub use snapshot::BackendKeyRecord;
pub use snapshot::BackendSnapshot;
pub use state::PipelineErrorKind;
pub use state::PipelineRun;
pub use state::PipelineState;
pub use state::RunSummary;
pub use state::Stage;
pub use state::StageFailure;
pub use state::StateTransitionError;
pub use time::Timestamp;
pub use translation::EntryId;
pub use translation::LocalizationKey;
pub use translation::Platform;
pub use translation::StatusTransitionError;
pub use translation::SupportedLocale;
pub use translation::TranslationEntry;
pub use translation::TranslationOrigin;
pub use translation::TranslationStatus;
pub use translation::UnusedKeyCandidate;
