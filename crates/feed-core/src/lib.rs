pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod models;
pub mod nostr;
pub mod runtime;
pub mod stats;
pub mod store;
pub mod tracing_setup;
pub mod viewport;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FeedConfig;
pub use error::{FeedError, Result};
pub use events::FeedSignal;
pub use models::{Entry, FeedEventKind, FeedItem, PrependEntry};
pub use runtime::FeedSession;
pub use stats::{FeedStats, SharedFeedStats};
pub use store::{EntryFilter, FeedReconciler, MutePredicate, SettleSource, SettleTracker};
pub use viewport::{RelatedDataSink, RelatedDataTransport, ViewportSubscriptionManager};
