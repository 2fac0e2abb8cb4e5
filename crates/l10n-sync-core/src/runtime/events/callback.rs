// crates/l10n-sync-core/src/runtime/events/callback.rs
// ============================================================================
// Module: L10n Sync Callback Sink
// Description: Callback-based sink for synchronous event observers.
// Purpose: Invoke a user-provided function with each pipeline event.
// Dependencies: std
// ============================================================================

//! ## Overview
//! [`CallbackSink`] delivers events by invoking a user-supplied function on the
//! worker task. Handlers should return quickly; they run between stages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::runtime::events::EventSink;
use crate::runtime::events::PipelineEvent;
use crate::runtime::events::SinkError;

// ============================================================================
// SECTION: Callback Sink
// ============================================================================

/// Callback-based event sink.
#[derive(Clone)]
pub struct CallbackSink {
    /// Handler invoked with each event.
    handler: Arc<CallbackHandler>,
}

/// Callback handler signature used by the sink.
type CallbackHandler = dyn Fn(&PipelineEvent) -> Result<(), SinkError> + Send + Sync;

impl CallbackSink {
    /// Creates a callback sink from a handler function.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&PipelineEvent) -> Result<(), SinkError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl EventSink for CallbackSink {
    fn deliver(&self, event: &PipelineEvent) -> Result<(), SinkError> {
        (self.handler)(event)
    }
}
