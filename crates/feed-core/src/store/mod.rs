pub mod reconciler;
pub mod settle;

pub use reconciler::{EntryFilter, FeedReconciler, MutePredicate};
pub use settle::{SettleSource, SettleTracker};
