/// Where an end-of-stored-events signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettleSource {
    /// Live relay subscription finished its backlog
    Network,
    /// Local cache replay finished
    Cache,
}

/// Tracks end-of-stored-events across sources. The feed is settled only once every
/// expected source has reported.
#[derive(Debug, Clone)]
pub struct SettleTracker {
    expect_cache: bool,
    network_done: bool,
    cache_done: bool,
    settled: bool,
}

impl SettleTracker {
    pub fn new(expect_cache: bool) -> Self {
        Self {
            expect_cache,
            network_done: false,
            cache_done: false,
            settled: false,
        }
    }

    /// Record a signal. Returns true only on the call that completes the set.
    pub fn record(&mut self, source: SettleSource) -> bool {
        match source {
            SettleSource::Network => self.network_done = true,
            SettleSource::Cache => self.cache_done = true,
        }

        let complete = self.network_done && (self.cache_done || !self.expect_cache);
        if complete && !self.settled {
            self.settled = true;
            return true;
        }
        false
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }
}
