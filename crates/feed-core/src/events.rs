use nostr_sdk::Event;

use crate::store::SettleSource;

/// Input to a `FeedSession`, produced by whatever owns the relay subscription.
#[derive(Debug, Clone)]
pub enum FeedSignal {
    /// A raw event matching the feed filter, from either source
    Event(Box<Event>),
    /// One source finished delivering its stored backlog
    EndOfStoredEvents(SettleSource),
}
