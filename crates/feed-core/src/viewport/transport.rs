use std::sync::Arc;

use nostr_sdk::prelude::*;

use crate::constants::kinds;
use crate::error::Result;

/// Receives related data (reactions, zaps) for a window of entries.
///
/// Implemented by the aggregation stores outside the feed core. Calls may arrive from
/// transport threads, so implementations only merge into their own state.
pub trait RelatedDataSink: Send + Sync {
    fn on_event(&self, event: &Event);

    /// Stored events delivered together, typically everything before EOSE.
    fn on_events_batch(&self, events: &[Event]);
}

/// Opens and closes related-data subscriptions on behalf of the viewport manager.
///
/// Reliability is the transport's concern: the manager never retries a failed `open`.
pub trait RelatedDataTransport {
    type Handle;

    fn open(&mut self, filter: Filter, sink: Arc<dyn RelatedDataSink>) -> Result<Self::Handle>;

    fn close(&mut self, handle: Self::Handle);
}

/// Reactions and zap receipts referencing any of `ids`.
pub fn related_data_filter(ids: &[EventId]) -> Filter {
    Filter::new()
        .kinds(kinds::RELATED_DATA.iter().map(|k| Kind::from(*k)))
        .events(ids.iter().copied())
}
