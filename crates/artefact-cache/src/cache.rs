//! TTL cache with LRU capacity bound and write-driven invalidation.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use artefact_types::{ArtefactRecord, CalendarKey};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::key::CacheKey;

/// A cached query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Record(ArtefactRecord),
    Keys(Vec<CalendarKey>),
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

struct CacheInner {
    lru: LruCache<CacheKey, Entry>,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Process-local cache in front of the artefact store.
///
/// Constructed once per process and shared by handle. Reads check expiry and
/// evict lazily; the `invalidate_on_*` hooks evict eagerly.
pub struct ArtefactCache {
    inner: Mutex<CacheInner>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl ArtefactCache {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(cap),
                hits: 0,
                misses: 0,
            }),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up an entry, evicting it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.lru.get(key) {
            Some(entry) if now > entry.expires_at => true,
            Some(entry) => {
                let value = entry.value.clone();
                inner.hits += 1;
                trace!(key = %key, "Cache hit");
                return Some(value);
            }
            None => false,
        };

        if expired {
            debug!(key = %key, "Cache entry expired, evicting");
            inner.lru.pop(key);
        }
        inner.misses += 1;
        None
    }

    pub fn get_record(&self, key: &CacheKey) -> Option<ArtefactRecord> {
        match self.get(key) {
            Some(CachedValue::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn get_keys(&self, key: &CacheKey) -> Option<Vec<CalendarKey>> {
        match self.get(key) {
            Some(CachedValue::Keys(keys)) => Some(keys),
            _ => None,
        }
    }

    /// Store a value with the expiry of its key class.
    pub fn insert(&self, key: CacheKey, value: CachedValue) {
        if !self.config.enabled {
            return;
        }

        let expires_at = self.clock.now() + self.config.ttl_for(key.class());
        let mut inner = self.inner.lock();
        inner.lru.put(key, Entry { value, expires_at });

        trace!(key = %key, cache_size = inner.lru.len(), "Cache entry inserted");
    }

    /// Drop a single entry. Returns whether it was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.lock().lru.pop(key).is_some()
    }

    /// Whether a live (unexpired) entry exists, without touching LRU order.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = self.clock.now();
        self.inner
            .lock()
            .lru
            .peek(key)
            .is_some_and(|entry| now <= entry.expires_at)
    }

    /// Invalidate everything a newly completed `key` could make stale:
    /// the latest pointer, the key list, the key's own record, the `next`
    /// pointer of the day before and the `prev` pointer of the day after.
    pub fn invalidate_on_complete(&self, key: CalendarKey) {
        let mut targets = vec![CacheKey::Latest, CacheKey::AllDates, CacheKey::Record(key)];
        if let Some(before) = key.pred() {
            targets.push(CacheKey::Next(before));
        }
        if let Some(after) = key.succ() {
            targets.push(CacheKey::Prev(after));
        }

        let mut inner = self.inner.lock();
        for target in &targets {
            inner.lru.pop(target);
        }
        debug!(key = %key, evicted = targets.len(), "Invalidated cache on completion");
    }

    /// Deleting a record changes the same derived reads as completing one.
    pub fn invalidate_on_delete(&self, key: CalendarKey) {
        self.invalidate_on_complete(key);
    }

    /// Translations change the record body but not ordering.
    pub fn invalidate_on_translation(&self, key: CalendarKey) {
        let mut inner = self.inner.lock();
        inner.lru.pop(&CacheKey::Record(key));
        inner.lru.pop(&CacheKey::Latest);
        debug!(key = %key, "Invalidated cache on translation update");
    }

    pub fn clear(&self) {
        self.inner.lock().lru.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.lru.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use artefact_types::ArtefactStatus;
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;

    fn key(s: &str) -> CalendarKey {
        CalendarKey::parse(s).unwrap()
    }

    fn record(k: &str) -> ArtefactRecord {
        ArtefactRecord {
            id: 1,
            key: key(k),
            title: format!("title {k}"),
            description: "desc".into(),
            latitude: 0.0,
            longitude: 0.0,
            location_name: "loc".into(),
            model_prompt: "prompt".into(),
            source_event: "event".into(),
            asset_ref: format!("models/{k}.glb"),
            pipeline_state: None,
            status: ArtefactStatus::Completed,
            translations: None,
            created_at: Utc::now(),
        }
    }

    fn cache_with_clock() -> (ArtefactCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ArtefactCache::with_clock(CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_get_after_insert() {
        let (cache, _) = cache_with_clock();
        cache.insert(
            CacheKey::Record(key("2024-06-02")),
            CachedValue::Record(record("2024-06-02")),
        );

        let hit = cache.get_record(&CacheKey::Record(key("2024-06-02"))).unwrap();
        assert_eq!(hit.title, "title 2024-06-02");
        assert!(cache.get_record(&CacheKey::Record(key("2024-06-03"))).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_expiry_is_per_key_class() {
        let (cache, clock) = cache_with_clock();
        cache.insert(CacheKey::Latest, CachedValue::Record(record("2024-06-02")));
        cache.insert(
            CacheKey::Record(key("2024-06-02")),
            CachedValue::Record(record("2024-06-02")),
        );

        // Past the one-hour latest expiry but well within the one-day record expiry.
        clock.advance(Duration::from_secs(2 * 60 * 60));

        assert!(cache.get(&CacheKey::Latest).is_none());
        assert!(cache.get(&CacheKey::Record(key("2024-06-02"))).is_some());
        // The expired entry was evicted on read.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_live_until_ttl_elapses() {
        let (cache, clock) = cache_with_clock();
        cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![key("2024-06-01")]));

        clock.advance(Duration::from_secs(60 * 60));
        assert!(cache.contains(&CacheKey::AllDates));

        clock.advance(Duration::from_millis(1));
        assert!(!cache.contains(&CacheKey::AllDates));
        assert!(cache.get_keys(&CacheKey::AllDates).is_none());
    }

    #[test]
    fn test_invalidate_on_complete_targets_neighbours() {
        let (cache, _) = cache_with_clock();
        let k = key("2024-06-02");

        cache.insert(CacheKey::Latest, CachedValue::Record(record("2024-06-01")));
        cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![key("2024-06-01")]));
        cache.insert(CacheKey::Record(k), CachedValue::Record(record("2024-06-02")));
        cache.insert(
            CacheKey::Next(key("2024-06-01")),
            CachedValue::Record(record("2024-06-05")),
        );
        cache.insert(
            CacheKey::Prev(key("2024-06-03")),
            CachedValue::Record(record("2024-06-01")),
        );
        // Unrelated entries survive.
        cache.insert(
            CacheKey::Record(key("2024-05-01")),
            CachedValue::Record(record("2024-05-01")),
        );
        cache.insert(
            CacheKey::Prev(key("2024-06-01")),
            CachedValue::Record(record("2024-05-01")),
        );

        cache.invalidate_on_complete(k);

        assert!(!cache.contains(&CacheKey::Latest));
        assert!(!cache.contains(&CacheKey::AllDates));
        assert!(!cache.contains(&CacheKey::Record(k)));
        assert!(!cache.contains(&CacheKey::Next(key("2024-06-01"))));
        assert!(!cache.contains(&CacheKey::Prev(key("2024-06-03"))));
        assert!(cache.contains(&CacheKey::Record(key("2024-05-01"))));
        assert!(cache.contains(&CacheKey::Prev(key("2024-06-01"))));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_on_translation_keeps_navigation() {
        let (cache, _) = cache_with_clock();
        let k = key("2024-06-02");
        cache.insert(CacheKey::Latest, CachedValue::Record(record("2024-06-02")));
        cache.insert(CacheKey::Record(k), CachedValue::Record(record("2024-06-02")));
        cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![k]));

        cache.invalidate_on_translation(k);

        assert!(!cache.contains(&CacheKey::Latest));
        assert!(!cache.contains(&CacheKey::Record(k)));
        assert!(cache.contains(&CacheKey::AllDates));
    }

    #[test]
    fn test_disabled_cache_never_stores() {
        let cache = ArtefactCache::new(CacheConfig::default().disabled());
        cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![]));
        assert!(cache.is_empty());
        assert!(cache.get(&CacheKey::AllDates).is_none());
    }

    #[test]
    fn test_capacity_bound_evicts_least_recent() {
        let clock = Arc::new(ManualClock::new());
        let cache =
            ArtefactCache::with_clock(CacheConfig::default().with_max_entries(2), clock);
        cache.insert(CacheKey::Latest, CachedValue::Record(record("2024-06-01")));
        cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![]));
        cache.insert(
            CacheKey::Record(key("2024-06-01")),
            CachedValue::Record(record("2024-06-01")),
        );

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::Latest));
    }
}
