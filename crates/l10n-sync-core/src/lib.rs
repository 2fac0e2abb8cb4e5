// crates/l10n-sync-core/src/lib.rs
// ============================================================================
// Module: L10n Sync Core Library
// Description: Localization reconciliation pipeline: model, interfaces, and runtime.
// Purpose: Reconcile source keys with a translation backend and drive the workflow.
// Dependencies: async-trait, bigdecimal, serde, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! L10n Sync Core reconciles localization keys extracted from source trees
//! against a translation-management backend, fills the gaps through plugins or
//! a machine-translation provider, and writes the results back after a human
//! review checkpoint. Collaborators (extractor, backend, translator, report
//! store, plugins) are traits so hosts can supply their own.
//! Invariants:
//! - At most one run is active per [`Orchestrator`].
//! - A run always parks at the review checkpoint before any backend write.
//! - Only explicitly approved unused keys are ever deleted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::BackendId;
pub use crate::core::BackendKeyRecord;
pub use crate::core::BackendSnapshot;
pub use crate::core::EntryId;
pub use crate::core::LocaleCode;
pub use crate::core::LocalizationKey;
pub use crate::core::PipelineErrorKind;
pub use crate::core::PipelineRun;
pub use crate::core::PipelineState;
pub use crate::core::Platform;
pub use crate::core::PluginName;
pub use crate::core::RunId;
pub use crate::core::RunSummary;
pub use crate::core::Stage;
pub use crate::core::StageFailure;
pub use crate::core::SupportedLocale;
pub use crate::core::Timestamp;
pub use crate::core::TranslationEntry;
pub use crate::core::TranslationOrigin;
pub use crate::core::TranslationStatus;
pub use crate::core::UnusedKeyCandidate;
pub use crate::interfaces::ActionContext;
pub use crate::interfaces::ActionOutcome;
pub use crate::interfaces::ActionPlugin;
pub use crate::interfaces::BackendClient;
pub use crate::interfaces::BypassValue;
pub use crate::interfaces::ExtensionPlugin;
pub use crate::interfaces::ExtractionError;
pub use crate::interfaces::Extractor;
pub use crate::interfaces::PluginDescriptor;
pub use crate::interfaces::PluginError;
pub use crate::interfaces::PluginKind;
pub use crate::interfaces::PromptContext;
pub use crate::interfaces::PromptPlugin;
pub use crate::interfaces::ProviderFailure;
pub use crate::interfaces::ReportError;
pub use crate::interfaces::ReportStore;
pub use crate::interfaces::TranslationBatch;
pub use crate::interfaces::TranslationProvider;
pub use crate::interfaces::UploadOutcome;
pub use crate::interfaces::UploadRejection;
pub use crate::runtime::CommandError;
pub use crate::runtime::Orchestrator;
pub use crate::runtime::PipelineConfig;
pub use crate::runtime::PipelineServices;
