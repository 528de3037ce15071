//! Durable storage for artefacts.
//!
//! - [`ArtefactStore`]: one SQLite row per calendar key with a forward-only
//!   status lifecycle and an embedded pipeline checkpoint.
//! - [`AssetStore`]: put/get of the produced binary asset, keyed by calendar key.
//! - [`ArtefactRepository`]: the read-through cached facade used by readers,
//!   whose writes invalidate exactly the cache entries they make stale.

pub mod assets;
pub mod error;
pub mod repository;
pub mod store;

pub use assets::{ASSET_CONTENT_TYPE, AssetStore, FsAssetStore, MemoryAssetStore, asset_ref_for};
pub use error::{Result, StoreError};
pub use repository::{ArtefactRepository, Navigation};
pub use store::ArtefactStore;
