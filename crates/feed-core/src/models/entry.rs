use std::collections::HashSet;

use nostr_sdk::prelude::*;

/// One reconciled unit of the feed, keyed by the content's event id.
///
/// An entry can exist before its content does: a repost, bookmark or deletion that
/// references an unseen id creates a placeholder that later arrivals fill in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EventId,
    /// The content event, once known
    pub event: Option<Event>,
    /// Repost events in arrival order
    pub reposts: Vec<Event>,
    /// Max `created_at` of the content and every repost/bookmark referencing it
    pub timestamp: Timestamp,
    /// Authors who issued a deletion against this id
    pub deleted_by: HashSet<PublicKey>,
    /// Set once a deletion from the content's own author is confirmed
    pub deleted: bool,
    /// Insertion ordinal into the canonical map
    pub first_seen: u64,
}

impl Entry {
    pub fn new(id: EventId, first_seen: u64) -> Self {
        Self {
            id,
            event: None,
            reposts: Vec::new(),
            timestamp: Timestamp::from(0),
            deleted_by: HashSet::new(),
            deleted: false,
            first_seen,
        }
    }

    /// Author of the content, if the content is known.
    pub fn author(&self) -> Option<PublicKey> {
        self.event.as_ref().map(|e| e.pubkey)
    }

    pub fn bump_timestamp(&mut self, created_at: Timestamp) {
        if created_at > self.timestamp {
            self.timestamp = created_at;
        }
    }

    /// Attach (or replace) the content event and settle any deletion that was waiting for it.
    pub fn attach_event(&mut self, event: Event) {
        self.bump_timestamp(event.created_at);
        self.deleted = self.deleted_by.contains(&event.pubkey);
        self.event = Some(event);
    }

    pub fn push_repost(&mut self, repost: Event) {
        self.bump_timestamp(repost.created_at);
        self.reposts.push(repost);
    }

    /// Record a deletion. Only the content's own author can delete it.
    pub fn record_deletion(&mut self, author: PublicKey) {
        self.deleted_by.insert(author);
        if self.author() == Some(author) {
            self.deleted = true;
        }
    }

    /// Most recent repost author, used to label reshared entries.
    pub fn latest_reposter(&self) -> Option<PublicKey> {
        self.reposts
            .iter()
            .max_by_key(|r| r.created_at)
            .map(|r| r.pubkey)
    }
}

/// Caller-supplied header row rendered above all entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrependEntry {
    pub key: String,
}

impl PrependEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// One row of the render list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedItem<'a> {
    Prepend(&'a PrependEntry),
    Entry(&'a Entry),
}

impl<'a> FeedItem<'a> {
    pub fn as_entry(&self) -> Option<&'a Entry> {
        match self {
            FeedItem::Entry(entry) => Some(entry),
            FeedItem::Prepend(_) => None,
        }
    }
}
