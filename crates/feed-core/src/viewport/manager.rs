//! Opens related-data subscriptions for the windows around the viewport.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use nostr_sdk::EventId;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::stats::SharedFeedStats;

use super::slice::{windows_around, Slice};
use super::transport::{related_data_filter, RelatedDataSink, RelatedDataTransport};

/// Keeps one related-data subscription per window of entries near the viewport.
///
/// Windows that scroll out of view are not closed right away: they get a grace deadline,
/// and a window that comes back before it expires is reused as-is. Deadlines are checked
/// by `tick`.
pub struct ViewportSubscriptionManager<T: RelatedDataTransport> {
    transport: T,
    sink: Arc<dyn RelatedDataSink>,
    clock: Arc<dyn Clock>,
    window_size: usize,
    teardown_grace: Duration,
    list: Vec<EventId>,
    active_index: Option<usize>,
    /// Slices keyed by anchor
    slices: HashMap<EventId, Slice<T::Handle>>,
    stats: SharedFeedStats,
}

impl<T: RelatedDataTransport> ViewportSubscriptionManager<T> {
    pub fn new(
        config: &FeedConfig,
        transport: T,
        sink: Arc<dyn RelatedDataSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            sink,
            clock,
            window_size: config.window_size.max(1),
            teardown_grace: config.teardown_grace(),
            list: Vec::new(),
            active_index: None,
            slices: HashMap::new(),
            stats: SharedFeedStats::new(),
        }
    }

    pub fn with_stats(mut self, stats: SharedFeedStats) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the list the windows index into. No-op if the ids are unchanged.
    pub fn set_render_list(&mut self, ids: &[EventId]) {
        if self.list == ids {
            return;
        }
        self.list = ids.to_vec();
        self.reconcile();
    }

    /// First visible index, or `None` when no list is on screen.
    pub fn set_active_index(&mut self, index: Option<usize>) {
        self.active_index = index;
        self.reconcile();
    }

    fn reconcile(&mut self) {
        let now = self.clock.instant();
        let needed = match self.active_index {
            Some(index) => windows_around(&self.list, index, self.window_size),
            None => Vec::new(),
        };
        let needed_anchors: HashSet<EventId> = needed.iter().map(|w| w.anchor).collect();

        for slice in self.slices.values_mut() {
            if needed_anchors.contains(&slice.anchor) {
                if slice.pending_teardown.take().is_some() {
                    debug!(anchor = %slice.anchor, "slice back in view, teardown cancelled");
                }
            } else if slice.pending_teardown.is_none() {
                slice.pending_teardown = Some(now + self.teardown_grace);
                debug!(anchor = %slice.anchor, "slice left view, teardown scheduled");
            }
        }

        for window in needed {
            if self.slices.contains_key(&window.anchor) {
                continue;
            }

            let covered = self.live_ids();
            let event_ids: Vec<EventId> = window
                .ids
                .into_iter()
                .filter(|id| !covered.contains(id))
                .collect();
            if event_ids.is_empty() {
                continue;
            }

            let handle = match self
                .transport
                .open(related_data_filter(&event_ids), self.sink.clone())
            {
                Ok(handle) => {
                    self.stats.record_subscription_opened();
                    Some(handle)
                }
                Err(e) => {
                    warn!(anchor = %window.anchor, "related-data subscription failed: {}", e);
                    None
                }
            };

            debug!(
                anchor = %window.anchor,
                start = window.start_index,
                end = window.end_index,
                ids = event_ids.len(),
                "opened slice"
            );
            self.slices.insert(
                window.anchor,
                Slice {
                    anchor: window.anchor,
                    event_ids,
                    start_index: window.start_index,
                    end_index: window.end_index,
                    handle,
                    pending_teardown: None,
                },
            );
        }
    }

    /// Ids owned by slices that are in view and actually subscribed. A slice whose open
    /// failed claims nothing, so its ids can still join a neighbouring window.
    fn live_ids(&self) -> HashSet<EventId> {
        self.slices
            .values()
            .filter(|s| s.is_live() && s.handle.is_some())
            .flat_map(|s| s.event_ids.iter().copied())
            .collect()
    }

    /// Close every slice whose grace deadline has passed. Returns how many closed.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.instant();
        let expired: Vec<EventId> = self
            .slices
            .values()
            .filter(|s| s.pending_teardown.is_some_and(|deadline| deadline <= now))
            .map(|s| s.anchor)
            .collect();

        for anchor in &expired {
            if let Some(slice) = self.slices.remove(anchor) {
                self.close_slice(slice);
            }
        }
        expired.len()
    }

    fn close_slice(&mut self, slice: Slice<T::Handle>) {
        if let Some(handle) = slice.handle {
            self.transport.close(handle);
            self.stats.record_subscription_closed();
        }
        debug!(anchor = %slice.anchor, "closed slice");
    }

    /// Close everything now, ignoring grace deadlines.
    pub fn dispose(&mut self) {
        let slices: Vec<Slice<T::Handle>> = self.slices.drain().map(|(_, s)| s).collect();
        for slice in slices {
            self.close_slice(slice);
        }
    }

    // ===== Reads =====

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    pub fn slice(&self, anchor: &EventId) -> Option<&Slice<T::Handle>> {
        self.slices.get(anchor)
    }

    /// Ids covered by any open slice, including ones awaiting teardown.
    pub fn subscribed_ids(&self) -> HashSet<EventId> {
        self.slices
            .values()
            .filter(|s| s.handle.is_some())
            .flat_map(|s| s.event_ids.iter().copied())
            .collect()
    }

    pub fn pending_teardowns(&self) -> usize {
        self.slices.values().filter(|s| !s.is_live()).count()
    }
}

impl<T: RelatedDataTransport> Drop for ViewportSubscriptionManager<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
