pub mod entry;
pub mod kind;
pub mod tag_utils;

pub use entry::{Entry, FeedItem, PrependEntry};
pub use kind::FeedEventKind;
