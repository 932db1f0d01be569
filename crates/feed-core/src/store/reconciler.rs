use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use nostr_sdk::prelude::*;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::models::tag_utils::{first_referenced_event_id, referenced_event_ids};
use crate::models::{Entry, FeedEventKind, FeedItem, PrependEntry};
use crate::stats::SharedFeedStats;

/// Returns true when an author is muted or blacklisted.
pub type MutePredicate = Arc<dyn Fn(&PublicKey) -> bool + Send + Sync>;

/// Returns true to keep an entry. The second argument is the entry's insertion ordinal.
pub type EntryFilter = Arc<dyn Fn(&Entry, u64) -> bool + Send + Sync>;

/// Merges a live, unordered, possibly duplicated event stream into a stable render list.
///
/// Two phases:
/// - Priming (before `mark_settled`): every candidate that raises the highest timestamp
///   seen so far triggers an eager flush, so the initial load fills in quickly.
/// - Settled: fresh candidates wait in `pending` until the caller flushes, so content never
///   moves under the user's finger. Candidates older than the staleness cutoff are
///   historical backfill and fold straight into the rendered list.
///
/// One reconciler per subscription configuration; reconfiguring means building a new one.
pub struct FeedReconciler {
    entries: HashMap<EventId, Entry>,
    pending: HashSet<EventId>,
    rendered: HashSet<EventId>,
    rendered_order: Vec<EventId>,
    seen_event_ids: HashSet<EventId>,
    settled: bool,
    settled_at: Option<Timestamp>,
    highest_timestamp: Timestamp,
    next_ordinal: u64,
    render_revision: u64,
    staleness_threshold: Duration,
    is_muted: MutePredicate,
    entry_filter: Option<EntryFilter>,
    prepend: Vec<PrependEntry>,
    clock: Arc<dyn Clock>,
    stats: SharedFeedStats,
}

impl FeedReconciler {
    pub fn new(config: &FeedConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashSet::new(),
            rendered: HashSet::new(),
            rendered_order: Vec::new(),
            seen_event_ids: HashSet::new(),
            settled: false,
            settled_at: None,
            highest_timestamp: Timestamp::from(0),
            next_ordinal: 0,
            render_revision: 0,
            staleness_threshold: config.staleness_threshold(),
            is_muted: Arc::new(|_: &PublicKey| false),
            entry_filter: None,
            prepend: config.prepend.iter().map(PrependEntry::new).collect(),
            clock,
            stats: SharedFeedStats::new(),
        }
    }

    pub fn with_mute_filter(mut self, is_muted: MutePredicate) -> Self {
        self.is_muted = is_muted;
        self
    }

    pub fn with_entry_filter(mut self, filter: EntryFilter) -> Self {
        self.entry_filter = Some(filter);
        self
    }

    pub fn with_stats(mut self, stats: SharedFeedStats) -> Self {
        self.stats = stats;
        self
    }

    // ===== Ingestion =====

    /// Merge one raw event. Returns true if the rendered list changed.
    ///
    /// Never fails: duplicates are absorbed, unknown kinds ignored, and references to
    /// unseen content create placeholder entries.
    pub fn ingest(&mut self, event: &Event) -> bool {
        if !self.seen_event_ids.insert(event.id) {
            trace!(id = %event.id, "duplicate delivery");
            self.stats.record_duplicate();
            return false;
        }

        let touched = match FeedEventKind::classify(event.kind) {
            FeedEventKind::Content => {
                self.entry_mut(event.id).attach_event(event.clone());
                vec![event.id]
            }
            FeedEventKind::Repost => self.merge_repost(event),
            FeedEventKind::Bookmark => {
                let ids = referenced_event_ids(event);
                for id in &ids {
                    self.entry_mut(*id).bump_timestamp(event.created_at);
                }
                ids
            }
            FeedEventKind::Deletion => {
                let ids = referenced_event_ids(event);
                for id in &ids {
                    self.entry_mut(*id).record_deletion(event.pubkey);
                }
                ids
            }
            FeedEventKind::Unrecognized => {
                trace!(kind = event.kind.as_u16(), "ignoring unrecognized kind");
                self.stats.record_unrecognized();
                return false;
            }
        };
        self.stats.record_event(event.kind.as_u16());

        let revision = self.render_revision;
        for id in touched {
            self.place(id);
        }
        self.render_revision != revision
    }

    fn merge_repost(&mut self, repost: &Event) -> Vec<EventId> {
        // Relays that embed the original event let us resolve content before it arrives.
        let embedded = if repost.content.trim().is_empty() {
            None
        } else {
            match Event::from_json(&repost.content) {
                Ok(original) => match original.verify() {
                    Ok(()) => Some(original),
                    Err(e) => {
                        debug!(id = %repost.id, "repost payload fails verification: {}", e);
                        self.stats.record_malformed_repost();
                        None
                    }
                },
                Err(e) => {
                    debug!(id = %repost.id, "repost payload is not an event: {}", e);
                    self.stats.record_malformed_repost();
                    None
                }
            }
        };

        let Some(target) =
            first_referenced_event_id(repost).or_else(|| embedded.as_ref().map(|e| e.id))
        else {
            debug!(id = %repost.id, "repost references nothing");
            return Vec::new();
        };

        let entry = self.entry_mut(target);
        entry.push_repost(repost.clone());
        if entry.event.is_none() {
            if let Some(original) = embedded.filter(|e| e.id == target) {
                entry.attach_event(original);
            }
        }
        vec![target]
    }

    fn entry_mut(&mut self, id: EventId) -> &mut Entry {
        let ordinal = &mut self.next_ordinal;
        self.entries.entry(id).or_insert_with(|| {
            let entry = Entry::new(id, *ordinal);
            *ordinal += 1;
            entry
        })
    }

    // ===== Placement =====

    fn is_candidate(&self, entry: &Entry) -> bool {
        let Some(event) = entry.event.as_ref() else {
            return false;
        };
        if entry.deleted || (self.is_muted)(&event.pubkey) {
            return false;
        }
        match &self.entry_filter {
            Some(filter) => filter(entry, entry.first_seen),
            None => true,
        }
    }

    fn place(&mut self, id: EventId) {
        let Some(entry) = self.entries.get(&id) else {
            return;
        };
        let timestamp = entry.timestamp;

        if !self.is_candidate(entry) {
            self.exclude(id);
            return;
        }
        if self.rendered.contains(&id) {
            return;
        }

        let new_max = timestamp > self.highest_timestamp;
        if new_max {
            self.highest_timestamp = timestamp;
        }

        if !self.settled {
            self.pending.insert(id);
            if new_max {
                self.flush("new-max");
            }
        } else if self.is_stale(timestamp) {
            self.fold_in(id, timestamp);
        } else {
            self.pending.insert(id);
        }
    }

    fn is_stale(&self, timestamp: Timestamp) -> bool {
        match self.settled_at {
            Some(settled_at) => {
                let cutoff = settled_at
                    .as_secs()
                    .saturating_sub(self.staleness_threshold.as_secs());
                timestamp.as_secs() < cutoff
            }
            None => false,
        }
    }

    /// Insert a backfill entry where its timestamp belongs without moving anything else.
    fn fold_in(&mut self, id: EventId, timestamp: Timestamp) {
        let position = self
            .rendered_order
            .iter()
            .position(|other| {
                self.entries
                    .get(other)
                    .is_some_and(|e| e.timestamp < timestamp)
            })
            .unwrap_or(self.rendered_order.len());

        self.pending.remove(&id);
        self.rendered.insert(id);
        self.rendered_order.insert(position, id);
        self.render_revision += 1;
        trace!(%id, position, "folded in stale entry");
    }

    fn exclude(&mut self, id: EventId) {
        self.pending.remove(&id);
        if self.rendered.remove(&id) {
            self.rendered_order.retain(|other| *other != id);
            self.render_revision += 1;
            debug!(%id, "removed entry from render list");
        }
    }

    fn compare_newest_first(entries: &HashMap<EventId, Entry>, a: &EventId, b: &EventId) -> Ordering {
        let ts = |id: &EventId| entries.get(id).map(|e| e.timestamp);
        ts(b).cmp(&ts(a)).then_with(|| b.cmp(a))
    }

    // ===== Operations =====

    /// Move pending entries into the rendered list.
    ///
    /// Settled: pending entries are sorted newest-first and placed ahead of the existing
    /// list, which keeps its order. Priming: nothing is pinned yet, so the whole list is
    /// re-sorted.
    pub fn flush(&mut self, reason: &str) {
        let mut fresh: Vec<EventId> = self.pending.drain().collect();

        if self.settled {
            if fresh.is_empty() {
                return;
            }
            let entries = &self.entries;
            fresh.sort_by(|a, b| Self::compare_newest_first(entries, a, b));
            self.rendered.extend(fresh.iter().copied());
            fresh.append(&mut self.rendered_order);
            self.rendered_order = fresh;
            self.render_revision += 1;
        } else {
            let previous = self.rendered_order.clone();
            self.rendered.extend(fresh.iter().copied());
            self.rendered_order.extend(fresh);
            let entries = &self.entries;
            self.rendered_order
                .sort_by(|a, b| Self::compare_newest_first(entries, a, b));
            if self.rendered_order != previous {
                self.render_revision += 1;
            }
        }

        self.stats.record_flush();
        debug!(
            reason,
            rendered = self.rendered_order.len(),
            settled = self.settled,
            "flushed pending entries"
        );
    }

    /// The stored backlog has been delivered. Idempotent.
    ///
    /// The settle flush still uses the priming policy, since entries buffered during
    /// priming are older than what is already shown and must be sorted in, not prepended.
    pub fn mark_settled(&mut self) {
        if self.settled {
            return;
        }
        self.flush("settle");
        self.settled = true;
        self.settled_at = Some(self.clock.unix_now());
        debug!(settled_at = ?self.settled_at, "feed settled");
    }

    /// Swap the mute predicate, drop every rendered or pending entry that now fails and
    /// bring back entries that pass again.
    pub fn reapply_filter(&mut self, is_muted: MutePredicate) {
        self.is_muted = is_muted;
        self.refresh_filter();
    }

    /// Re-run the current predicate, for predicates that read shared mute state.
    ///
    /// Re-admitted entries go through normal placement: stale ones fold in once settled,
    /// the rest wait in pending.
    pub fn refresh_filter(&mut self) {
        let violators: Vec<EventId> = self
            .rendered
            .iter()
            .chain(self.pending.iter())
            .filter(|id| {
                self.entries
                    .get(id)
                    .map_or(true, |entry| !self.is_candidate(entry))
            })
            .copied()
            .collect();

        for id in violators {
            self.exclude(id);
        }

        let entries = &self.entries;
        let mut readmitted: Vec<EventId> = entries
            .values()
            .filter(|entry| {
                !self.rendered.contains(&entry.id)
                    && !self.pending.contains(&entry.id)
                    && self.is_candidate(entry)
            })
            .map(|entry| entry.id)
            .collect();
        if readmitted.is_empty() {
            return;
        }
        // Oldest first, so priming eager flushes happen at most once per new max
        readmitted.sort_by(|a, b| Self::compare_newest_first(entries, b, a));

        debug!(count = readmitted.len(), "re-admitting entries after filter change");
        for id in readmitted {
            self.place(id);
        }
        if !self.settled {
            self.flush("refilter");
        }
    }

    // ===== Reads =====

    pub fn entry(&self, id: &EventId) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &HashMap<EventId, Entry> {
        &self.entries
    }

    /// Header rows, then entries in display order.
    pub fn render_list(&self) -> Vec<FeedItem<'_>> {
        self.prepend
            .iter()
            .map(FeedItem::Prepend)
            .chain(
                self.rendered_order
                    .iter()
                    .filter_map(|id| self.entries.get(id))
                    .map(FeedItem::Entry),
            )
            .collect()
    }

    pub fn rendered_ids(&self) -> &[EventId] {
        &self.rendered_order
    }

    pub fn pending_ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.pending.iter().copied().collect();
        let entries = &self.entries;
        ids.sort_by(|a, b| Self::compare_newest_first(entries, a, b));
        ids
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn prepend_count(&self) -> usize {
        self.prepend.len()
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Bumped whenever the rendered order changes.
    pub fn render_revision(&self) -> u64 {
        self.render_revision
    }

    pub fn stats(&self) -> SharedFeedStats {
        self.stats.clone()
    }
}
