//! Binary asset storage keyed by calendar key.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use artefact_types::CalendarKey;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::{Result, StoreError};

/// Media type of stored assets.
pub const ASSET_CONTENT_TYPE: &str = "model/gltf-binary";

/// Stable reference for the asset of `key`.
pub fn asset_ref_for(key: CalendarKey) -> String {
    format!("models/{key}.glb")
}

/// Durable put/get of produced binary assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `data` for `key`, overwriting any previous asset, and return its reference.
    async fn put(&self, key: CalendarKey, data: Bytes) -> Result<String>;

    /// Fetch a previously stored asset by reference.
    async fn get(&self, asset_ref: &str) -> Result<Option<Bytes>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Filesystem
// ─────────────────────────────────────────────────────────────────────────────

/// Asset store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to a path under the root, rejecting escapes.
    fn resolve(&self, asset_ref: &str) -> Result<PathBuf> {
        let rel = Path::new(asset_ref);
        let safe = !asset_ref.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidAssetRef(asset_ref.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn put(&self, key: CalendarKey, data: Bytes) -> Result<String> {
        let asset_ref = asset_ref_for(key);
        let path = self.resolve(&asset_ref)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write then rename so a reader never sees a partial file.
        let tmp = path.with_extension("glb.part");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(key = %key, bytes = data.len(), path = %path.display(), "Asset stored");
        Ok(asset_ref)
    }

    async fn get(&self, asset_ref: &str) -> Result<Option<Bytes>> {
        let path = self.resolve(asset_ref)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory asset store (for tests and dry runs).
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put(&self, key: CalendarKey, data: Bytes) -> Result<String> {
        let asset_ref = asset_ref_for(key);
        self.objects.lock().insert(asset_ref.clone(), data);
        Ok(asset_ref)
    }

    async fn get(&self, asset_ref: &str) -> Result<Option<Bytes>> {
        Ok(self.objects.lock().get(asset_ref).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CalendarKey {
        CalendarKey::parse(s).unwrap()
    }

    #[test]
    fn test_asset_ref_layout() {
        assert_eq!(asset_ref_for(key("2024-06-02")), "models/2024-06-02.glb");
    }

    #[tokio::test]
    async fn test_fs_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());

        let asset_ref = store
            .put(key("2024-06-02"), Bytes::from_static(b"glTF"))
            .await
            .unwrap();
        assert_eq!(asset_ref, "models/2024-06-02.glb");
        assert!(dir.path().join("models/2024-06-02.glb").is_file());
        assert!(!dir.path().join("models/2024-06-02.glb.part").exists());

        let data = store.get(&asset_ref).await.unwrap().unwrap();
        assert_eq!(&data[..], b"glTF");
    }

    #[tokio::test]
    async fn test_fs_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        store.put(key("2024-06-02"), Bytes::from_static(b"old")).await.unwrap();
        let asset_ref = store.put(key("2024-06-02"), Bytes::from_static(b"new")).await.unwrap();

        assert_eq!(&store.get(&asset_ref).await.unwrap().unwrap()[..], b"new");
    }

    #[tokio::test]
    async fn test_fs_missing_asset_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        assert!(store.get("models/2020-01-01.glb").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_rejects_escaping_refs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        for bad in ["../secret", "/etc/passwd", "", "models/../../x"] {
            let err = store.get(bad).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidAssetRef(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryAssetStore::new();
        let asset_ref = store
            .put(key("2024-06-02"), Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(&store.get(&asset_ref).await.unwrap().unwrap()[..], b"abc");
    }
}
