// crates/l10n-sync-core/src/runtime/events/log.rs
// ============================================================================
// Module: L10n Sync Log Sink
// Description: JSON-lines sink for durable event logs.
// Purpose: Persist every pipeline event as one JSON record per line.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! `LogSink` serializes each event with `serde_json` and appends a newline,
//! producing a replayable JSON-lines log of a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use crate::runtime::events::EventSink;
use crate::runtime::events::PipelineEvent;
use crate::runtime::events::SinkError;

// ============================================================================
// SECTION: Log Sink
// ============================================================================

/// JSON-lines event sink.
pub struct LogSink<W: Write + Send> {
    /// Output writer for log records.
    writer: Mutex<W>,
}

impl<W: Write + Send> LogSink<W> {
    /// Creates a log sink writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::LogWriteFailed`] when the writer mutex is poisoned.
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|_| SinkError::LogWriteFailed("log writer mutex poisoned".to_string()))
    }
}

impl<W: Write + Send> EventSink for LogSink<W> {
    fn deliver(&self, event: &PipelineEvent) -> Result<(), SinkError> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| SinkError::LogWriteFailed("log writer mutex poisoned".to_string()))?;
        serde_json::to_writer(&mut *guard, event).map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        guard.write_all(b"\n").map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        guard.flush().map_err(|err| SinkError::LogWriteFailed(err.to_string()))?;
        drop(guard);
        Ok(())
    }
}
