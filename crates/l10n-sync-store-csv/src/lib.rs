// crates/l10n-sync-store-csv/src/lib.rs
// ============================================================================
// Module: L10n Sync CSV Report Store
// Description: File-backed ReportStore shared with human reviewers.
// Purpose: Persist pipeline reports as CSV files that spreadsheet tools can edit.
// Dependencies: csv, l10n-sync-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate implements [`l10n_sync_core::ReportStore`] on top of a reports
//! directory. Each report is a `<name>.csv` file; ownership while the
//! orchestrator is running is tracked by a sibling `<name>.csv.lock` file.
//!
//! ## Invariants
//! - Reports are written with a comma delimiter and read with whichever
//!   delimiter the header line uses.
//! - A report is replaced atomically (temporary file, then rename).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::COLUMNS;
pub use store::CsvReportStore;
pub use store::CsvStoreError;
pub use store::detect_delimiter;
