// crates/l10n-sync-core/src/runtime/events/channel.rs
// ============================================================================
// Module: L10n Sync Channel Sink
// Description: Channel-based sink for asynchronous event observers.
// Purpose: Forward pipeline events through an unbounded Tokio mpsc channel.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`ChannelSink`] forwards each event into an unbounded
//! `tokio::sync::mpsc` channel. The channel preserves send order, so a
//! subscriber receives events in sequence order.
//! Invariants:
//! - Successful deliveries enqueue exactly one event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

use crate::runtime::events::EventSink;
use crate::runtime::events::PipelineEvent;
use crate::runtime::events::SinkError;

// ============================================================================
// SECTION: Channel Sink
// ============================================================================

/// Channel-based event sink.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    /// Sender used to forward events.
    sender: UnboundedSender<PipelineEvent>,
}

impl ChannelSink {
    /// Creates a channel sink from an existing sender.
    #[must_use]
    pub const fn new(sender: UnboundedSender<PipelineEvent>) -> Self {
        Self {
            sender,
        }
    }

    /// Creates a sink together with the receiving half.
    #[must_use]
    pub fn pair() -> (Self, UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: &PipelineEvent) -> Result<(), SinkError> {
        if self.sender.is_closed() {
            return Err(SinkError::Closed);
        }
        self.sender.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}
