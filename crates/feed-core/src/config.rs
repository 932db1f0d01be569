use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_WINDOW_SIZE, STALENESS_THRESHOLD_SECS, TEARDOWN_GRACE_MS};
use crate::error::Result;

/// Tunables for one feed session.
///
/// Every field has a default, so a partial JSON document is enough:
/// `{"window_size": 20}` keeps everything else as shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Seconds before the settle wall-clock after which an entry counts as backfill
    pub staleness_threshold_secs: u64,
    /// Entries per related-data window
    pub window_size: usize,
    /// Grace period before an off-screen window is closed
    pub teardown_grace_ms: u64,
    /// Whether the feed waits for the local cache to report end-of-stored-events
    pub expect_cache_eose: bool,
    /// Header rows rendered above every entry
    pub prepend: Vec<String>,
}

impl FeedConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_threshold_secs)
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_millis(self.teardown_grace_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: STALENESS_THRESHOLD_SECS,
            window_size: DEFAULT_WINDOW_SIZE,
            teardown_grace_ms: TEARDOWN_GRACE_MS,
            expect_cache_eose: true,
            prepend: Vec::new(),
        }
    }
}
