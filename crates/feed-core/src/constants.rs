//! Feed-wide constants
//!
//! Centralized location for event kinds and tunable defaults that are
//! shared between the reconciler, the viewport manager and the config layer.

/// Default relay used by the `feed_tail` diagnostic binary
pub const RELAY_URL: &str = "wss://relay.damus.io";

/// Entries older than this (relative to the settle wall-clock) are folded in
/// silently instead of being announced as new.
pub const STALENESS_THRESHOLD_SECS: u64 = 5 * 60; // 5 minutes

/// Number of entries covered by each related-data window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// How long a slice lingers after leaving the viewport before it is closed
pub const TEARDOWN_GRACE_MS: u64 = 500;

// Nostr event kinds the feed understands
pub mod kinds {
    /// Text note
    pub const TEXT_NOTE: u16 = 1;
    /// Deletion request
    pub const DELETION: u16 = 5;
    /// Repost of a kind:1 note
    pub const REPOST: u16 = 6;
    /// Reaction (related data)
    pub const REACTION: u16 = 7;
    /// Repost of any other kind
    pub const GENERIC_REPOST: u16 = 16;
    /// Picture post
    pub const PICTURE: u16 = 20;
    /// Video post
    pub const VIDEO: u16 = 21;
    /// Short vertical video
    pub const SHORT_VIDEO: u16 = 22;
    /// File metadata
    pub const FILE_METADATA: u16 = 1063;
    /// Zap receipt (related data)
    pub const ZAP_RECEIPT: u16 = 9735;
    /// Bookmark list
    pub const BOOKMARK_LIST: u16 = 10003;
    /// Long-form article
    pub const LONG_FORM: u16 = 30023;

    /// Kinds rendered as feed content
    pub const CONTENT: [u16; 6] = [TEXT_NOTE, PICTURE, VIDEO, SHORT_VIDEO, FILE_METADATA, LONG_FORM];

    /// Kinds requested by related-data window subscriptions
    pub const RELATED_DATA: [u16; 2] = [REACTION, ZAP_RECEIPT];
}
