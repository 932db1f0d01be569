use std::sync::Arc;

use nostr_sdk::PublicKey;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::events::FeedSignal;
use crate::models::FeedItem;
use crate::stats::SharedFeedStats;
use crate::store::{EntryFilter, FeedReconciler, MutePredicate, SettleTracker};
use crate::viewport::{RelatedDataSink, RelatedDataTransport, ViewportSubscriptionManager};

/// One live feed: a reconciler, its settle tracking and the related-data windows around
/// the viewport.
///
/// Changing the content filter goes through `reconfigure`, which rebuilds all three.
/// The transport is cloned into each rebuilt viewport manager, so clones must share the
/// underlying connection.
pub struct FeedSession<T: RelatedDataTransport + Clone> {
    config: FeedConfig,
    clock: Arc<dyn Clock>,
    stats: SharedFeedStats,
    transport: T,
    sink: Arc<dyn RelatedDataSink>,
    is_muted: MutePredicate,
    entry_filter: Option<EntryFilter>,
    reconciler: FeedReconciler,
    settle: SettleTracker,
    viewport: ViewportSubscriptionManager<T>,
    /// Render revision last pushed to the viewport manager
    synced_revision: Option<u64>,
    /// Index as the UI sees it, header rows included
    active_index: Option<usize>,
}

impl<T: RelatedDataTransport + Clone> FeedSession<T> {
    pub fn new(
        config: FeedConfig,
        entry_filter: Option<EntryFilter>,
        transport: T,
        sink: Arc<dyn RelatedDataSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let stats = SharedFeedStats::new();
        let is_muted: MutePredicate = Arc::new(|_: &PublicKey| false);
        let reconciler = build_reconciler(&config, &clock, &stats, &is_muted, &entry_filter);
        let viewport =
            ViewportSubscriptionManager::new(&config, transport.clone(), sink.clone(), clock.clone())
                .with_stats(stats.clone());

        Self {
            settle: SettleTracker::new(config.expect_cache_eose),
            config,
            clock,
            stats,
            transport,
            sink,
            is_muted,
            entry_filter,
            reconciler,
            viewport,
            synced_revision: None,
            active_index: None,
        }
    }

    /// Feed one signal in. Returns true if the rendered list changed.
    pub fn apply(&mut self, signal: FeedSignal) -> bool {
        let revision = self.reconciler.render_revision();

        match signal {
            FeedSignal::Event(event) => {
                self.reconciler.ingest(&event);
            }
            FeedSignal::EndOfStoredEvents(source) => {
                if self.settle.record(source) {
                    self.reconciler.mark_settled();
                    info!(
                        rendered = self.reconciler.rendered_ids().len(),
                        "feed settled"
                    );
                } else {
                    debug!(?source, "end of stored events, waiting for remaining sources");
                }
            }
        }

        self.sync_viewport();
        self.reconciler.render_revision() != revision
    }

    /// Throw away all feed state and start over with a new content filter.
    ///
    /// Open related-data subscriptions close immediately.
    pub fn reconfigure(&mut self, entry_filter: Option<EntryFilter>) {
        self.entry_filter = entry_filter;
        self.reconciler = build_reconciler(
            &self.config,
            &self.clock,
            &self.stats,
            &self.is_muted,
            &self.entry_filter,
        );
        self.settle = SettleTracker::new(self.config.expect_cache_eose);
        // Assigning drops the old manager, which disposes its slices
        self.viewport = ViewportSubscriptionManager::new(
            &self.config,
            self.transport.clone(),
            self.sink.clone(),
            self.clock.clone(),
        )
        .with_stats(self.stats.clone());
        self.synced_revision = None;

        let active = self.entry_index(self.active_index);
        self.viewport.set_active_index(active);
        info!("feed reconfigured");
    }

    /// Show the pending entries. Returns true if the rendered list changed.
    pub fn flush(&mut self, reason: &str) -> bool {
        let revision = self.reconciler.render_revision();
        self.reconciler.flush(reason);
        self.sync_viewport();
        self.reconciler.render_revision() != revision
    }

    /// First visible row in UI coordinates, header rows included.
    pub fn set_active_index(&mut self, index: Option<usize>) {
        self.active_index = index;
        let entry_index = self.entry_index(index);
        self.viewport.set_active_index(entry_index);
    }

    /// Swap the mute predicate. Entries it now rejects are dropped and entries it accepts
    /// again come back.
    pub fn set_mute_filter(&mut self, is_muted: MutePredicate) {
        self.is_muted = is_muted.clone();
        self.reconciler.reapply_filter(is_muted);
        self.sync_viewport();
    }

    /// Re-run the current mute predicate after the state it reads has changed.
    pub fn refresh_filter(&mut self) {
        self.reconciler.refresh_filter();
        self.sync_viewport();
    }

    /// Drive teardown deadlines. Returns how many slices closed.
    pub fn tick(&mut self) -> usize {
        self.viewport.tick()
    }

    fn entry_index(&self, index: Option<usize>) -> Option<usize> {
        index.map(|i| i.saturating_sub(self.reconciler.prepend_count()))
    }

    fn sync_viewport(&mut self) {
        let revision = self.reconciler.render_revision();
        if self.synced_revision == Some(revision) {
            return;
        }
        self.viewport.set_render_list(self.reconciler.rendered_ids());
        self.synced_revision = Some(revision);
    }

    // ===== Reads =====

    pub fn render_list(&self) -> Vec<FeedItem<'_>> {
        self.reconciler.render_list()
    }

    pub fn pending_count(&self) -> usize {
        self.reconciler.pending_count()
    }

    pub fn is_settled(&self) -> bool {
        self.reconciler.is_settled()
    }

    pub fn reconciler(&self) -> &FeedReconciler {
        &self.reconciler
    }

    pub fn viewport(&self) -> &ViewportSubscriptionManager<T> {
        &self.viewport
    }

    pub fn stats(&self) -> SharedFeedStats {
        self.stats.clone()
    }
}

fn build_reconciler(
    config: &FeedConfig,
    clock: &Arc<dyn Clock>,
    stats: &SharedFeedStats,
    is_muted: &MutePredicate,
    entry_filter: &Option<EntryFilter>,
) -> FeedReconciler {
    let reconciler = FeedReconciler::new(config, clock.clone())
        .with_mute_filter(is_muted.clone())
        .with_stats(stats.clone());
    match entry_filter {
        Some(filter) => reconciler.with_entry_filter(filter.clone()),
        None => reconciler,
    }
}
