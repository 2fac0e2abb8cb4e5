// crates/l10n-sync-cli/src/lib.rs
// ============================================================================
// Module: L10n Sync CLI Library
// Description: Shared helpers for the l10n-sync command-line interface.
// Purpose: Keep message formatting, prompt parsing, and wiring testable.
// Dependencies: l10n-sync-{core, config, plugins, providers, store-csv}.
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) is a thin dispatcher. Everything it
//! needs that can be exercised without a terminal lives here:
//! - [`messages`]: the catalog behind the [`t!`](crate::t) macro.
//! - [`answers`]: parsing of checkpoint prompt answers.
//! - [`render`]: one-line rendering of pipeline events.
//! - [`wiring`]: construction of collaborators from configuration, plus the
//!   read-only cost projection used by `l10n-sync estimate`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod answers;
pub mod messages;
pub mod render;
pub mod wiring;
