//! Blob storage: `(key, variant extension) -> text` under the cache root.

use crate::error::{ErrorKind, Result};
use crate::key::CacheKey;
use bru_storage::BackendHandle;
use exn::ResultExt;

pub struct Store {
    backend: BackendHandle,
}

impl Store {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Writes (or overwrites) the blob for `key` in the given variant.
    pub async fn write(&self, key: &CacheKey, content: &str, extension: &str) -> Result<()> {
        let path = key.blob_path(extension);
        self.backend
            .write(&path, content.as_bytes())
            .await
            .or_raise(|| ErrorKind::Write(path.display().to_string()))?;
        tracing::trace!(key = %key, blob = %path.display(), bytes = content.len(), "Wrote cache blob");
        Ok(())
    }

    /// Reads the blob for `key`. Any failure, whatever the cause, is a
    /// [`CacheMiss`](ErrorKind::CacheMiss).
    pub async fn read(&self, key: &CacheKey, extension: &str) -> Result<String> {
        let path = key.blob_path(extension);
        let miss = || ErrorKind::CacheMiss(key.to_string());
        let bytes = self.backend.read(&path).await.or_raise(miss)?;
        String::from_utf8(bytes).or_raise(miss)
    }

    /// Deletes the blob for `key`.
    ///
    /// A blob that is already gone is reported as
    /// [`CacheMiss`](ErrorKind::CacheMiss); any other failure is
    /// [`RemovalFailed`](ErrorKind::RemovalFailed). The index is left alone;
    /// keeping the two in step is the job of the [`Cache`](crate::Cache).
    pub async fn remove(&self, key: &CacheKey, extension: &str) -> Result<()> {
        let path = key.blob_path(extension);
        match self.backend.delete(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Err(err).or_raise(|| ErrorKind::CacheMiss(key.to_string())),
            Err(err) => Err(err).or_raise(|| ErrorKind::RemovalFailed(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bru_storage::backend::{LocalBackend, MockBackend, StorageBackend};
    use std::path::Path;
    use std::sync::Arc;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let store = Store::new(backend.clone());
        store.write(&key("modules/ask/mod.ts"), "# Ask", ".md").await.unwrap();
        assert_eq!(store.read(&key("modules/ask/mod.ts"), ".md").await.unwrap(), "# Ask");
        assert!(backend.exists(Path::new("modules/ask/mod.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_variants_are_separate() {
        let store = Store::new(Arc::new(MockBackend::default()));
        store.write(&key("modules/ask/mod.ts"), "summary", ".md").await.unwrap();
        store.write(&key("modules/ask/mod.ts"), "doc", ".mdx").await.unwrap();
        assert_eq!(store.read(&key("modules/ask/mod.ts"), ".md").await.unwrap(), "summary");
        assert_eq!(store.read(&key("modules/ask/mod.ts"), ".mdx").await.unwrap(), "doc");
        let err = store.read(&key("modules/ask/mod.ts"), ".txt").await.unwrap_err();
        assert!(err.is_miss());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = Store::new(Arc::new(MockBackend::default()));
        store.write(&key("docs/intro.md"), "one", ".txt").await.unwrap();
        store.write(&key("docs/intro.md"), "two", ".txt").await.unwrap();
        assert_eq!(store.read(&key("docs/intro.md"), ".txt").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_unreadable_is_miss() {
        let backend = MockBackend::with_files([("docs/intro.txt", vec![0xff, 0xfe])]).with_denied(["docs/locked.txt"]);
        let store = Store::new(Arc::new(backend));
        assert!(store.read(&key("docs/intro.md"), ".txt").await.unwrap_err().is_miss());
        assert!(store.read(&key("docs/locked.md"), ".txt").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = Store::new(Arc::new(MockBackend::default()));
        store.write(&key("docs/intro.md"), "hello", ".md").await.unwrap();
        store.remove(&key("docs/intro.md"), ".md").await.unwrap();
        assert!(store.read(&key("docs/intro.md"), ".md").await.unwrap_err().is_miss());

        let err = store.remove(&key("docs/intro.md"), ".md").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CacheMiss(_)));
    }

    #[tokio::test]
    async fn test_remove_failure() {
        let backend = MockBackend::with_files([("docs/intro.md", "hello")]).with_denied(["docs/intro.md"]);
        let store = Store::new(Arc::new(backend));
        let err = store.remove(&key("docs/intro.md"), ".md").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::RemovalFailed(_)));
    }

    #[tokio::test]
    async fn test_local_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(Arc::new(LocalBackend::new("cache", temp_dir.path()).unwrap()));
        store.write(&key("modules/ask/mod.ts"), "# Ask", ".md").await.unwrap();
        let on_disk = std::fs::read_to_string(temp_dir.path().join("modules/ask/mod.md")).unwrap();
        assert_eq!(on_disk, "# Ask");
    }
}
