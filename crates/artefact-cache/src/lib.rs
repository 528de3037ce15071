//! Process-local read-through cache for artefact reads.
//!
//! Entries carry an expiry computed from their key class and are evicted
//! lazily on read. Writes that change what a reader would observe call one of
//! the `invalidate_on_*` hooks, which drop the affected entries immediately
//! instead of waiting for them to expire.
//!
//! # Example
//!
//! ```rust,ignore
//! use artefact_cache::{ArtefactCache, CacheConfig, CacheKey, CachedValue};
//!
//! let cache = ArtefactCache::new(CacheConfig::default());
//! cache.insert(CacheKey::AllDates, CachedValue::Keys(vec![]));
//! cache.invalidate_on_complete(key);
//! ```

mod cache;
mod clock;
mod config;
mod key;

pub use cache::{ArtefactCache, CacheStats, CachedValue};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use key::{CacheKey, KeyClass};
