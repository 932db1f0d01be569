//! Property-Based Tests
//!
//! The reconciler must converge on the same state no matter how relays order,
//! duplicate or interleave deliveries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nostr_sdk::prelude::*;
use proptest::prelude::*;

use feed_core::constants::kinds;
use feed_core::{FeedConfig, FeedReconciler, ManualClock};

const NOW: u64 = 1_700_000_000;
const NOTES: usize = 6;
const AUTHORS: usize = 3;

// ============================================================
// Event universe
// ============================================================

#[derive(Debug, Clone)]
enum Op {
    Deliver { note: usize },
    Repost { by: usize, note: usize, age: u64, embed: bool },
    /// Repost whose embedded JSON claims the note's id but is signed by `by`
    ForgedRepost { by: usize, note: usize, age: u64 },
    Bookmark { by: usize, notes: Vec<usize>, age: u64 },
    Delete { by: usize, note: usize, age: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let note = 0..NOTES;
    let by = 0..AUTHORS;
    let age = 0u64..600;
    prop_oneof![
        3 => note.clone().prop_map(|note| Op::Deliver { note }),
        2 => (by.clone(), note.clone(), age.clone(), any::<bool>())
            .prop_map(|(by, note, age, embed)| Op::Repost { by, note, age, embed }),
        1 => (by.clone(), note.clone(), age.clone())
            .prop_map(|(by, note, age)| Op::ForgedRepost { by, note, age }),
        1 => (by.clone(), prop::collection::vec(note.clone(), 1..3), age.clone())
            .prop_map(|(by, notes, age)| Op::Bookmark { by, notes, age }),
        1 => (by, note, age).prop_map(|(by, note, age)| Op::Delete { by, note, age }),
    ]
}

/// Ops plus a permutation of their indices
fn ops_and_permutation() -> impl Strategy<Value = (Vec<Op>, Vec<usize>)> {
    prop::collection::vec(op_strategy(), 1..40).prop_flat_map(|ops| {
        let order: Vec<usize> = (0..ops.len()).collect();
        (Just(ops), Just(order).prop_shuffle())
    })
}

struct Universe {
    authors: Vec<Keys>,
    notes: Vec<Event>,
}

impl Universe {
    fn new() -> Self {
        let authors: Vec<Keys> = (0..AUTHORS).map(|_| Keys::generate()).collect();
        let notes = (0..NOTES)
            .map(|i| {
                sign(
                    EventBuilder::new(Kind::from(kinds::TEXT_NOTE), format!("note {}", i)),
                    NOW - 700 + (i as u64) * 100,
                    &authors[i % AUTHORS],
                )
            })
            .collect();
        Self { authors, notes }
    }

    fn build(&self, op: &Op) -> Event {
        match op {
            Op::Deliver { note } => self.notes[*note].clone(),
            Op::Repost { by, note, age, embed } => {
                let original = &self.notes[*note];
                let payload = if *embed { original.as_json() } else { String::new() };
                sign(
                    EventBuilder::new(Kind::from(kinds::REPOST), payload)
                        .tag(Tag::event(original.id)),
                    NOW - age,
                    &self.authors[*by],
                )
            }
            Op::ForgedRepost { by, note, age } => {
                let claimed = self.notes[*note].id;
                let impostor = sign(
                    EventBuilder::new(Kind::from(kinds::TEXT_NOTE), "impostor"),
                    NOW - age,
                    &self.authors[*by],
                );
                let payload = impostor.as_json().replace(&impostor.id.to_hex(), &claimed.to_hex());
                sign(
                    EventBuilder::new(Kind::from(kinds::REPOST), payload).tag(Tag::event(claimed)),
                    NOW - age,
                    &self.authors[*by],
                )
            }
            Op::Bookmark { by, notes, age } => sign(
                EventBuilder::new(Kind::from(kinds::BOOKMARK_LIST), "")
                    .tags(notes.iter().map(|n| Tag::event(self.notes[*n].id))),
                NOW - age,
                &self.authors[*by],
            ),
            Op::Delete { by, note, age } => sign(
                EventBuilder::new(Kind::from(kinds::DELETION), "")
                    .tag(Tag::event(self.notes[*note].id)),
                NOW - age,
                &self.authors[*by],
            ),
        }
    }
}

fn sign(builder: EventBuilder, created_at: u64, keys: &Keys) -> Event {
    builder
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .unwrap()
}

fn reconciler() -> FeedReconciler {
    FeedReconciler::new(&FeedConfig::default(), Arc::new(ManualClock::new(NOW)))
}

/// Per-entry state that must not depend on arrival order. Reposts are compared as a set.
#[derive(Debug, PartialEq, Eq)]
struct EntryState {
    resolved: bool,
    timestamp: Timestamp,
    deleted: bool,
    deleted_by: HashSet<PublicKey>,
    reposts: HashSet<EventId>,
}

fn snapshot(feed: &FeedReconciler) -> HashMap<EventId, EntryState> {
    feed.entries()
        .iter()
        .map(|(id, entry)| {
            let state = EntryState {
                resolved: entry.event.is_some(),
                timestamp: entry.timestamp,
                deleted: entry.deleted,
                deleted_by: entry.deleted_by.clone(),
                reposts: entry.reposts.iter().map(|r| r.id).collect(),
            };
            (*id, state)
        })
        .collect()
}

// ============================================================
// Merge properties
// ============================================================

proptest! {
    /// Property: delivering the same events again changes nothing
    #[test]
    fn prop_redelivery_is_idempotent(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let universe = Universe::new();
        let events: Vec<Event> = ops.iter().map(|op| universe.build(op)).collect();

        let mut feed = reconciler();
        for event in &events {
            feed.ingest(event);
        }
        let before = snapshot(&feed);
        let rendered = feed.rendered_ids().to_vec();
        let revision = feed.render_revision();

        for event in &events {
            prop_assert!(!feed.ingest(event));
        }

        prop_assert_eq!(snapshot(&feed), before);
        prop_assert_eq!(feed.rendered_ids(), rendered.as_slice());
        prop_assert_eq!(feed.render_revision(), revision);
    }

    /// Property: any arrival order converges on the same entries and render order
    #[test]
    fn prop_arrival_order_does_not_matter((ops, order) in ops_and_permutation()) {
        let universe = Universe::new();
        let events: Vec<Event> = ops.iter().map(|op| universe.build(op)).collect();

        let mut in_order = reconciler();
        for event in &events {
            in_order.ingest(event);
        }
        in_order.flush("final");

        let mut shuffled = reconciler();
        for &i in &order {
            shuffled.ingest(&events[i]);
        }
        shuffled.flush("final");

        prop_assert_eq!(snapshot(&in_order), snapshot(&shuffled));
        prop_assert_eq!(in_order.rendered_ids(), shuffled.rendered_ids());
    }

    /// Property: an entry's timestamp never goes backwards
    #[test]
    fn prop_timestamps_are_monotonic(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let universe = Universe::new();
        let mut feed = reconciler();
        let mut last_seen: HashMap<EventId, Timestamp> = HashMap::new();

        for op in &ops {
            feed.ingest(&universe.build(op));
            for (id, entry) in feed.entries() {
                if let Some(previous) = last_seen.get(id) {
                    prop_assert!(entry.timestamp >= *previous);
                }
                last_seen.insert(*id, entry.timestamp);
            }
        }
    }

    /// Property: once settled, arrivals never reorder what is already on screen
    #[test]
    fn prop_settled_feed_keeps_relative_order(
        first in prop::collection::vec(op_strategy(), 1..20),
        second in prop::collection::vec(op_strategy(), 1..20),
    ) {
        let universe = Universe::new();
        let mut feed = reconciler();
        for op in &first {
            feed.ingest(&universe.build(op));
        }
        feed.mark_settled();
        let before = feed.rendered_ids().to_vec();

        for op in &second {
            feed.ingest(&universe.build(op));
        }

        let after: HashSet<EventId> = feed.rendered_ids().iter().copied().collect();
        let survivors: Vec<EventId> =
            before.iter().copied().filter(|id| after.contains(id)).collect();
        let before_set: HashSet<EventId> = before.iter().copied().collect();
        let kept: Vec<EventId> = feed
            .rendered_ids()
            .iter()
            .copied()
            .filter(|id| before_set.contains(id))
            .collect();

        prop_assert_eq!(kept, survivors);
    }
}
