// crates/l10n-sync-core/src/runtime/store.rs
// ============================================================================
// Module: L10n Sync In-Memory Report Store
// Description: Simple in-memory report store for tests and embedding hosts.
// Purpose: Provide a deterministic report store implementation without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`ReportStore`]. It
//! honours claims so hand-off behaviour can be observed, and lets callers
//! edit a report between checkpoints the way a human reviewer would edit a
//! file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::TranslationEntry;
use crate::interfaces::ReportError;
use crate::interfaces::ReportStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable store contents.
#[derive(Debug, Default)]
struct StoreState {
    /// Reports by name.
    reports: BTreeMap<String, Vec<TranslationEntry>>,
    /// Reports currently claimed.
    claimed: BTreeSet<String>,
}

/// In-memory report store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReportStore {
    /// Store state protected by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryReportStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an external edit to a report, as a reviewer would.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Locked`] while the report is claimed, or
    /// [`ReportError::Io`] when the report does not exist.
    pub fn edit<F>(&self, report: &str, edit: F) -> Result<(), ReportError>
    where
        F: FnOnce(&mut Vec<TranslationEntry>),
    {
        let mut guard = self.lock()?;
        if guard.claimed.contains(report) {
            return Err(ReportError::Locked(report.to_string()));
        }
        let entries = guard
            .reports
            .get_mut(report)
            .ok_or_else(|| ReportError::Io(format!("report not found: {report}")))?;
        edit(entries);
        drop(guard);
        Ok(())
    }

    /// Returns true when `report` is currently claimed.
    #[must_use]
    pub fn is_claimed(&self, report: &str) -> bool {
        self.lock().is_ok_and(|guard| guard.claimed.contains(report))
    }

    /// Returns the names of every stored report.
    #[must_use]
    pub fn report_names(&self) -> Vec<String> {
        self.lock().map(|guard| guard.reports.keys().cloned().collect()).unwrap_or_default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreState>, ReportError> {
        self.state.lock().map_err(|_| ReportError::Io("report store mutex poisoned".to_string()))
    }
}

impl ReportStore for InMemoryReportStore {
    fn write(&self, report: &str, entries: &[TranslationEntry]) -> Result<(), ReportError> {
        self.lock()?.reports.insert(report.to_string(), entries.to_vec());
        Ok(())
    }

    fn read(&self, report: &str) -> Result<Vec<TranslationEntry>, ReportError> {
        self.lock()?
            .reports
            .get(report)
            .cloned()
            .ok_or_else(|| ReportError::Io(format!("report not found: {report}")))
    }

    fn exists(&self, report: &str) -> bool {
        self.lock().is_ok_and(|guard| guard.reports.contains_key(report))
    }

    fn claim(&self, report: &str) -> Result<(), ReportError> {
        let mut guard = self.lock()?;
        if !guard.claimed.insert(report.to_string()) {
            return Err(ReportError::Locked(report.to_string()));
        }
        drop(guard);
        Ok(())
    }

    fn release(&self, report: &str) -> Result<(), ReportError> {
        self.lock()?.claimed.remove(report);
        Ok(())
    }
}
