//! Configuration for the artefact cache.

use std::time::Duration;

use crate::KeyClass;

/// Default maximum number of cached entries.
pub const DEFAULT_MAX_ENTRIES: usize = 4_096;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Expiry per key class plus a capacity bound.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry for the latest-record entry. It changes daily, so keep it short.
    pub latest_ttl: Duration,

    /// Expiry for per-key record entries. Completed records barely change.
    pub record_ttl: Duration,

    /// Expiry for the completed-key list.
    pub dates_ttl: Duration,

    /// Expiry for prev/next neighbour entries.
    pub neighbour_ttl: Duration,

    /// Maximum number of entries before LRU eviction.
    pub max_entries: usize,

    /// When false, inserts are dropped and every read misses.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            latest_ttl: HOUR,
            record_ttl: DAY,
            dates_ttl: HOUR,
            neighbour_ttl: DAY,
            max_entries: DEFAULT_MAX_ENTRIES,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiry for entries of the given class.
    pub fn ttl_for(&self, class: KeyClass) -> Duration {
        match class {
            KeyClass::Latest => self.latest_ttl,
            KeyClass::AllDates => self.dates_ttl,
            KeyClass::Record => self.record_ttl,
            KeyClass::Neighbour => self.neighbour_ttl,
        }
    }

    pub fn with_latest_ttl(mut self, ttl: Duration) -> Self {
        self.latest_ttl = ttl;
        self
    }

    pub fn with_record_ttl(mut self, ttl: Duration) -> Self {
        self.record_ttl = ttl;
        self
    }

    pub fn with_dates_ttl(mut self, ttl: Duration) -> Self {
        self.dates_ttl = ttl;
        self
    }

    pub fn with_neighbour_ttl(mut self, ttl: Duration) -> Self {
        self.neighbour_ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Disable caching entirely.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
