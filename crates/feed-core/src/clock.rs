//! Time sources for the feed core.
//!
//! The reconciler needs unix wall-clock seconds (staleness cutoff at settle) and the
//! viewport manager needs a monotonic instant (teardown deadlines). Both come from one
//! `Clock` so tests can drive time by hand.

use std::time::{Duration, Instant};

use nostr_sdk::Timestamp;
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    /// Current unix time
    fn unix_now(&self) -> Timestamp;

    /// Current monotonic instant
    fn instant(&self) -> Instant;
}

/// Real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock. Both readings move together on `advance`.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    unix_origin: u64,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(unix_secs: u64) -> Self {
        Self {
            origin: Instant::now(),
            unix_origin: unix_secs,
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Clock for ManualClock {
    fn unix_now(&self) -> Timestamp {
        Timestamp::from(self.unix_origin + self.elapsed.lock().as_secs())
    }

    fn instant(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }
}
