//! Adapters between the feed core and a `nostr_sdk::Client`.

pub mod driver;
pub mod related;

pub use driver::FeedDriver;
pub use related::{NostrRelatedDataTransport, RelatedSubscription};
