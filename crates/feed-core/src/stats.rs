use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Counters for what the feed core has seen and done
#[derive(Debug, Default, Clone)]
pub struct FeedStats {
    /// Accepted raw events by kind
    pub by_kind: HashMap<u16, u64>,
    /// Total accepted raw events (duplicates excluded)
    pub total: u64,
    /// Re-deliveries absorbed by the seen-id guard
    pub duplicates: u64,
    /// Events whose kind has no dispatch rule
    pub unrecognized: u64,
    /// Reposts whose inline payload could not be parsed
    pub malformed_reposts: u64,
    /// Pending-to-rendered flushes
    pub flushes: u64,
    /// Related-data window subscriptions opened
    pub subscriptions_opened: u64,
    /// Related-data window subscriptions closed
    pub subscriptions_closed: u64,
}

impl FeedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, kind: u16) {
        self.total += 1;
        *self.by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Get list of kinds sorted by count (descending)
    pub fn kinds_by_count(&self) -> Vec<(u16, u64)> {
        let mut kinds: Vec<_> = self.by_kind.iter().map(|(&k, &c)| (k, c)).collect();
        kinds.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        kinds
    }

    /// Subscriptions currently open according to the counters
    pub fn subscriptions_open(&self) -> u64 {
        self.subscriptions_opened
            .saturating_sub(self.subscriptions_closed)
    }
}

/// Thread-safe wrapper for feed stats
#[derive(Debug, Clone)]
pub struct SharedFeedStats {
    inner: Arc<RwLock<FeedStats>>,
}

impl Default for SharedFeedStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedFeedStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeedStats::new())),
        }
    }

    fn update(&self, f: impl FnOnce(&mut FeedStats)) {
        if let Ok(mut stats) = self.inner.write() {
            f(&mut stats);
        }
    }

    pub fn record_event(&self, kind: u16) {
        self.update(|s| s.record_event(kind));
    }

    pub fn record_duplicate(&self) {
        self.update(|s| s.duplicates += 1);
    }

    pub fn record_unrecognized(&self) {
        self.update(|s| s.unrecognized += 1);
    }

    pub fn record_malformed_repost(&self) {
        self.update(|s| s.malformed_reposts += 1);
    }

    pub fn record_flush(&self) {
        self.update(|s| s.flushes += 1);
    }

    pub fn record_subscription_opened(&self) {
        self.update(|s| s.subscriptions_opened += 1);
    }

    pub fn record_subscription_closed(&self) {
        self.update(|s| s.subscriptions_closed += 1);
    }

    pub fn snapshot(&self) -> FeedStats {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }
}
