// crates/l10n-sync-config/src/lib.rs
// ============================================================================
// Module: L10n Sync Config Library
// Description: Canonical config model, validation, and runtime conversions.
// Purpose: Single source of truth for l10n-sync.toml semantics.
// Dependencies: l10n-sync-core, l10n-sync-plugins, serde, toml
// ============================================================================

//! ## Overview
//! `l10n-sync-config` defines the configuration model for the sync pipeline.
//! It loads `l10n-sync.toml` under strict size and path limits, validates it
//! fail-closed, resolves credentials from inline values or environment
//! variables, and converts itself into the runtime types the orchestrator,
//! gateway, cost estimator, and plugin registry consume.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
