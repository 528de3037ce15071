//! Cached read facade over [`ArtefactStore`].
//!
//! Reads go through the cache; writes that change what a reader would observe
//! invalidate the affected entries synchronously, before returning.

use std::sync::Arc;

use artefact_cache::{ArtefactCache, CacheKey, CachedValue};
use artefact_types::{ArtefactRecord, CalendarKey, Translations};
use serde_json::json;

use crate::{ArtefactStore, Result};

/// A record together with its neighbours in calendar order.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub record: ArtefactRecord,
    pub prev: Option<CalendarKey>,
    pub next: Option<CalendarKey>,
}

impl Navigation {
    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// JSON view used by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "record": self.record,
            "prev": self.prev,
            "next": self.next,
            "has_prev": self.has_prev(),
            "has_next": self.has_next(),
        })
    }
}

/// Store plus cache, shared by handle.
#[derive(Clone)]
pub struct ArtefactRepository {
    store: Arc<ArtefactStore>,
    cache: Arc<ArtefactCache>,
}

impl ArtefactRepository {
    pub fn new(store: Arc<ArtefactStore>, cache: Arc<ArtefactCache>) -> Self {
        Self { store, cache }
    }

    /// Uncached access for pipeline bookkeeping.
    pub fn store(&self) -> &ArtefactStore {
        &self.store
    }

    pub fn cache(&self) -> &ArtefactCache {
        &self.cache
    }

    // ── Cached reads ────────────────────────────────────────────────

    /// Record for `key`. Only completed records are cached.
    pub fn get_by_key(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        let cache_key = CacheKey::Record(key);
        if let Some(record) = self.cache.get_record(&cache_key) {
            return Ok(Some(record));
        }

        let record = self.store.get_by_key(key)?;
        if let Some(ref r) = record
            && r.is_completed()
        {
            self.cache.insert(cache_key, CachedValue::Record(r.clone()));
        }
        Ok(record)
    }

    pub fn latest_completed(&self) -> Result<Option<ArtefactRecord>> {
        self.read_through(CacheKey::Latest, || self.store.get_latest_completed())
    }

    pub fn prev_completed(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.read_through(CacheKey::Prev(key), || self.store.get_prev_completed(key))
    }

    pub fn next_completed(&self, key: CalendarKey) -> Result<Option<ArtefactRecord>> {
        self.read_through(CacheKey::Next(key), || self.store.get_next_completed(key))
    }

    /// Completed keys, newest first.
    pub fn completed_keys(&self) -> Result<Vec<CalendarKey>> {
        if let Some(keys) = self.cache.get_keys(&CacheKey::AllDates) {
            return Ok(keys);
        }
        let keys = self.store.list_completed_keys()?;
        self.cache
            .insert(CacheKey::AllDates, CachedValue::Keys(keys.clone()));
        Ok(keys)
    }

    /// Record for `key` (or the latest completed one) with neighbour pointers.
    pub fn navigation(&self, key: Option<CalendarKey>) -> Result<Option<Navigation>> {
        let record = match key {
            Some(k) => self.get_by_key(k)?,
            None => self.latest_completed()?,
        };
        let Some(record) = record else {
            return Ok(None);
        };

        let prev = self.prev_completed(record.key)?.map(|r| r.key);
        let next = self.next_completed(record.key)?.map(|r| r.key);
        Ok(Some(Navigation { record, prev, next }))
    }

    /// Cache a record read only when one was found.
    fn read_through(
        &self,
        cache_key: CacheKey,
        load: impl FnOnce() -> Result<Option<ArtefactRecord>>,
    ) -> Result<Option<ArtefactRecord>> {
        if let Some(record) = self.cache.get_record(&cache_key) {
            return Ok(Some(record));
        }
        let record = load()?;
        if let Some(ref r) = record {
            self.cache.insert(cache_key, CachedValue::Record(r.clone()));
        }
        Ok(record)
    }

    // ── Invalidating writes ─────────────────────────────────────────

    pub fn complete(&self, key: CalendarKey, asset_ref: &str) -> Result<ArtefactRecord> {
        let record = self.store.complete(key, asset_ref)?;
        self.cache.invalidate_on_complete(key);
        Ok(record)
    }

    pub fn set_translations(&self, key: CalendarKey, translations: &Translations) -> Result<()> {
        self.store.set_translations(key, translations)?;
        self.cache.invalidate_on_translation(key);
        Ok(())
    }

    pub fn delete(&self, key: CalendarKey) -> Result<bool> {
        let removed = self.store.delete(key)?;
        self.cache.invalidate_on_delete(key);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use artefact_cache::CacheConfig;
    use artefact_types::GeneratedContent;

    use super::*;

    fn key(s: &str) -> CalendarKey {
        CalendarKey::parse(s).unwrap()
    }

    fn content(title: &str) -> GeneratedContent {
        GeneratedContent {
            title: title.to_string(),
            description: "desc".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            location_name: "Somewhere".to_string(),
            model_prompt: "prompt".to_string(),
            source_event: "event".to_string(),
        }
    }

    fn repo() -> ArtefactRepository {
        ArtefactRepository::new(
            Arc::new(ArtefactStore::open_in_memory().unwrap()),
            Arc::new(ArtefactCache::new(CacheConfig::default())),
        )
    }

    fn complete(repo: &ArtefactRepository, k: &str) {
        repo.store().upsert_pending(key(k), &content(k), None).unwrap();
        repo.complete(key(k), &format!("models/{k}.glb")).unwrap();
    }

    #[test]
    fn test_pending_records_are_not_cached() {
        let repo = repo();
        repo.store()
            .upsert_pending(key("2024-06-02"), &content("x"), None)
            .unwrap();

        assert!(repo.get_by_key(key("2024-06-02")).unwrap().is_some());
        assert!(!repo.cache().contains(&CacheKey::Record(key("2024-06-02"))));
    }

    #[test]
    fn test_missing_neighbours_are_not_cached() {
        let repo = repo();
        complete(&repo, "2024-06-01");
        assert!(repo.prev_completed(key("2024-06-01")).unwrap().is_none());
        assert!(!repo.cache().contains(&CacheKey::Prev(key("2024-06-01"))));
    }

    #[test]
    fn test_completion_refreshes_latest_and_neighbours() {
        let repo = repo();
        complete(&repo, "2024-06-01");
        complete(&repo, "2024-06-05");

        // Warm the cache.
        assert_eq!(repo.latest_completed().unwrap().unwrap().key, key("2024-06-05"));
        assert_eq!(
            repo.next_completed(key("2024-06-01")).unwrap().unwrap().key,
            key("2024-06-05")
        );
        assert_eq!(repo.completed_keys().unwrap().len(), 2);

        // 2024-06-02 lands between them; its day-before `next` pointer must move.
        complete(&repo, "2024-06-02");

        assert_eq!(
            repo.next_completed(key("2024-06-01")).unwrap().unwrap().key,
            key("2024-06-02")
        );
        assert_eq!(repo.completed_keys().unwrap().len(), 3);

        complete(&repo, "2024-06-06");
        assert_eq!(repo.latest_completed().unwrap().unwrap().key, key("2024-06-06"));
    }

    #[test]
    fn test_translation_update_visible_through_cache() {
        let repo = repo();
        complete(&repo, "2024-06-02");
        assert!(repo.get_by_key(key("2024-06-02")).unwrap().unwrap().translations.is_none());

        let mut t = Translations::new();
        t.insert(
            "ja",
            artefact_types::TranslatableFields {
                title: "扇風機".into(),
                description: "d".into(),
                location_name: "l".into(),
                source_event: "s".into(),
            },
        );
        repo.set_translations(key("2024-06-02"), &t).unwrap();

        let record = repo.get_by_key(key("2024-06-02")).unwrap().unwrap();
        assert!(record.has_translations());
    }

    #[test]
    fn test_delete_evicts_record() {
        let repo = repo();
        complete(&repo, "2024-06-02");
        assert!(repo.get_by_key(key("2024-06-02")).unwrap().is_some());

        assert!(repo.delete(key("2024-06-02")).unwrap());
        assert!(repo.get_by_key(key("2024-06-02")).unwrap().is_none());
        assert!(repo.latest_completed().unwrap().is_none());
    }

    #[test]
    fn test_navigation_flags() {
        let repo = repo();
        complete(&repo, "2024-06-01");
        complete(&repo, "2024-06-03");

        let nav = repo.navigation(None).unwrap().unwrap();
        assert_eq!(nav.record.key, key("2024-06-03"));
        assert!(nav.has_prev());
        assert!(!nav.has_next());

        let nav = repo.navigation(Some(key("2024-06-01"))).unwrap().unwrap();
        assert!(!nav.has_prev());
        assert_eq!(nav.next, Some(key("2024-06-03")));
        assert_eq!(nav.to_json()["has_next"], true);

        assert!(repo.navigation(Some(key("2023-01-01"))).unwrap().is_none());
    }
}
