use nostr_sdk::Kind;

use crate::constants::kinds;

/// How the reconciler treats an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEventKind {
    /// Renderable content keyed by its own id
    Content,
    /// Reshare pointing at content through its `e` tag
    Repost,
    /// Bookmark list; every `e` tag bumps the referenced entry's recency
    Bookmark,
    /// Deletion request; every `e` tag is a retraction candidate
    Deletion,
    /// No dispatch rule
    Unrecognized,
}

impl FeedEventKind {
    pub fn classify(kind: Kind) -> Self {
        match kind.as_u16() {
            k if kinds::CONTENT.contains(&k) => FeedEventKind::Content,
            kinds::REPOST | kinds::GENERIC_REPOST => FeedEventKind::Repost,
            kinds::BOOKMARK_LIST => FeedEventKind::Bookmark,
            kinds::DELETION => FeedEventKind::Deletion,
            _ => FeedEventKind::Unrecognized,
        }
    }
}
