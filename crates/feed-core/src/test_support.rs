//! Event builders and a recording transport shared by unit tests.

use std::sync::Arc;

use nostr_sdk::prelude::*;
use parking_lot::Mutex;

use crate::constants::kinds;
use crate::error::{FeedError, Result};
use crate::viewport::{RelatedDataSink, RelatedDataTransport};

pub fn content(keys: &Keys, created_at: u64, text: &str) -> Event {
    EventBuilder::new(Kind::from(kinds::TEXT_NOTE), text)
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .expect("Failed to sign event")
}

/// Repost with the original embedded as JSON, the way most clients publish them.
pub fn repost(keys: &Keys, original: &Event, created_at: u64) -> Event {
    EventBuilder::new(Kind::from(kinds::REPOST), original.as_json())
        .tag(Tag::event(original.id))
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .expect("Failed to sign event")
}

/// Repost carrying only the reference.
pub fn bare_repost(keys: &Keys, target: EventId, created_at: u64, payload: &str) -> Event {
    EventBuilder::new(Kind::from(kinds::REPOST), payload)
        .tag(Tag::event(target))
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .expect("Failed to sign event")
}

/// Event JSON signed by `keys` whose `id` field was rewritten to claim `claimed`.
pub fn forged_payload(keys: &Keys, claimed: EventId, created_at: u64) -> String {
    let real = content(keys, created_at, "not what it claims");
    real.as_json().replace(&real.id.to_hex(), &claimed.to_hex())
}

pub fn bookmark(keys: &Keys, targets: &[EventId], created_at: u64) -> Event {
    EventBuilder::new(Kind::from(kinds::BOOKMARK_LIST), "")
        .tags(targets.iter().map(|id| Tag::event(*id)))
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .expect("Failed to sign event")
}

pub fn deletion(keys: &Keys, targets: &[EventId], created_at: u64) -> Event {
    EventBuilder::new(Kind::from(kinds::DELETION), "")
        .tags(targets.iter().map(|id| Tag::event(*id)))
        .custom_created_at(Timestamp::from(created_at))
        .sign_with_keys(keys)
        .expect("Failed to sign event")
}

pub fn event_id(seed: u8) -> EventId {
    EventId::from_byte_array([seed; 32])
}

/// What a `RecordingTransport` was asked to do.
#[derive(Debug, Default)]
pub struct TransportLog {
    next: u64,
    pub opened: Vec<(u64, Filter)>,
    pub closed: Vec<u64>,
    /// Fail the next `open` call
    pub fail_next: bool,
}

/// Transport that hands out sequential handles (starting at 1) and logs every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub log: Arc<Mutex<TransportLog>>,
}

impl RelatedDataTransport for RecordingTransport {
    type Handle = u64;

    fn open(&mut self, filter: Filter, _sink: Arc<dyn RelatedDataSink>) -> Result<u64> {
        let mut log = self.log.lock();
        if std::mem::take(&mut log.fail_next) {
            return Err(FeedError::SubscriptionOpen("relay refused".to_string()));
        }
        log.next += 1;
        let handle = log.next;
        log.opened.push((handle, filter));
        Ok(handle)
    }

    fn close(&mut self, handle: u64) {
        self.log.lock().closed.push(handle);
    }
}

pub struct NullSink;

impl RelatedDataSink for NullSink {
    fn on_event(&self, _event: &Event) {}
    fn on_events_batch(&self, _events: &[Event]) {}
}
