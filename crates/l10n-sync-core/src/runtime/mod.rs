// crates/l10n-sync-core/src/runtime/mod.rs
// ============================================================================
// Module: L10n Sync Runtime
// Description: Reconciliation, plugin dispatch, gateway, cost, events, and orchestration.
// Purpose: Drive a pipeline run through its stages and checkpoints.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime contains the deterministic stage logic (reconciliation, plugin
//! dispatch, cost estimation) and the asynchronous machinery around it: the
//! rate-limited gateway, event delivery, and the orchestrator that owns a
//! run's state machine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cost;
pub mod events;
pub mod gateway;
pub mod orchestrator;
pub mod plugins;
pub mod reconcile;
pub mod store;
mod worker;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cost::CharRatioCounter;
pub use cost::CostError;
pub use cost::CostEstimate;
pub use cost::ModelProfile;
pub use cost::PriceTable;
pub use cost::TokenCounter;
pub use cost::estimate;
pub use events::CallbackSink;
pub use events::ChannelSink;
pub use events::Checkpoint;
pub use events::EstimateReport;
pub use events::EventKind;
pub use events::EventSink;
pub use events::LogSink;
pub use events::PipelineEvent;
pub use events::SinkError;
pub use gateway::Gateway;
pub use gateway::GatewayError;
pub use gateway::Lane;
pub use gateway::RetryPolicy;
pub use orchestrator::CommandError;
pub use orchestrator::Orchestrator;
pub use orchestrator::PipelineConfig;
pub use orchestrator::PipelineServices;
pub use orchestrator::ReportNames;
pub use plugins::ActionResult;
pub use plugins::PluginCatalog;
pub use plugins::PluginExecutionError;
pub use plugins::PluginSet;
pub use reconcile::ExtractedKeys;
pub use reconcile::ReconcileScope;
pub use reconcile::ReconciliationResult;
pub use reconcile::reconcile;
pub use reconcile::unused_keys;
pub use store::InMemoryReportStore;
