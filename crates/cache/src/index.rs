//! The hash-table index: the single source of truth for "is this key cached".
//!
//! The index lives in one YAML document, `<namespace>_hashtable.yml`, at the
//! root of the cache backend. Every operation re-reads it, and every mutation
//! writes the whole document back. Mutations made through one [`Index`] are
//! serialized, and reads wait for any mutation in progress, so concurrent
//! tasks sharing it neither lose updates nor see a half-written document.
//! Separate processes still race (last writer wins).
//!
//! Failures here only ever cost a regeneration, so the public operations log
//! and carry on. The `try_*` and [`load`](Index::load) variants surface the
//! error for callers that care. A mutation never writes over a document it
//! could not read: only a missing or corrupt document is replaced.

use crate::error::{ErrorKind, Result};
use crate::key::{Bucket, CacheKey};
use crate::table::HashTable;
use bru_storage::BackendHandle;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::instrument;

pub struct Index {
    backend: BackendHandle,
    path: PathBuf,
    lock: RwLock<()>,
}

impl Index {
    pub fn new(backend: BackendHandle, namespace: &str) -> Self {
        Self {
            backend,
            path: PathBuf::from(format!("{namespace}_hashtable.yml")),
            lock: RwLock::new(()),
        }
    }

    /// Path of the index document relative to the cache root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the index document. A missing document is an empty
    /// index; anything else that goes wrong is
    /// [`IndexLoad`](ErrorKind::IndexLoad).
    pub async fn load(&self) -> Result<HashTable> {
        let _guard = self.lock.read().await;
        self.read_table().await
    }

    /// Like [`load`](Self::load), but an unreadable or corrupt document is
    /// logged and treated as empty.
    pub async fn ensure(&self) -> HashTable {
        match self.load().await {
            Ok(table) => table,
            Err(err) => {
                tracing::warn!(index = %self.path.display(), error = ?err, "Cache index unusable; treating as empty");
                HashTable::default()
            },
        }
    }

    /// Returns the key if it is filed in the index.
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let table = self.ensure().await;
        table.contains(&key.bucket()).then(|| PathBuf::from(key.as_str()))
    }

    /// Every filed entry.
    ///
    /// Keys `a` and `a/a` share a bucket, so an entry can stand for either;
    /// see [`Bucket::candidates`].
    pub async fn entries(&self) -> Vec<Bucket> {
        self.ensure().await.buckets().collect()
    }

    /// The raw document, or `None` when there isn't one.
    async fn read_document(&self) -> Result<Option<Vec<u8>>> {
        match self.backend.read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err).or_raise(|| ErrorKind::IndexLoad),
        }
    }

    fn parse(bytes: Vec<u8>) -> Result<HashTable> {
        let document = String::from_utf8(bytes).or_raise(|| ErrorKind::IndexLoad)?;
        HashTable::parse(&document).or_raise(|| ErrorKind::IndexLoad)
    }

    async fn read_table(&self) -> Result<HashTable> {
        match self.read_document().await? {
            Some(bytes) => Self::parse(bytes),
            None => Ok(HashTable::default()),
        }
    }

    /// The table a mutation starts from. A corrupt document is replaced, but
    /// a failed read aborts so the existing entries survive.
    async fn table_for_update(&self) -> Result<HashTable> {
        let Some(bytes) = self.read_document().await? else {
            return Ok(HashTable::default());
        };
        Ok(Self::parse(bytes).unwrap_or_else(|err| {
            tracing::warn!(index = %self.path.display(), error = ?err, "Replacing corrupt cache index");
            HashTable::default()
        }))
    }

    /// Files the key in the index. Returns `false` if it was already there,
    /// in which case nothing is written.
    #[instrument(level = "debug", skip_all, fields(key = %key))]
    pub async fn try_update(&self, key: &CacheKey) -> Result<bool> {
        let _guard = self.lock.write().await;
        let mut table = self.table_for_update().await?;
        if !table.insert(&key.bucket()) {
            return Ok(false);
        }
        self.persist(&table).await?;
        Ok(true)
    }

    /// [`try_update`](Self::try_update), logging a failure.
    pub async fn update(&self, key: &CacheKey) {
        if let Err(err) = self.try_update(key).await {
            tracing::error!(key = %key, error = ?err, "Could not record cache entry in index");
        }
    }

    /// Removes the key from the index, pruning empty buckets. Returns `false`
    /// if it wasn't filed, in which case nothing is written.
    #[instrument(level = "debug", skip_all, fields(key = %key))]
    pub async fn try_remove(&self, key: &CacheKey) -> Result<bool> {
        let _guard = self.lock.write().await;
        let mut table = self.table_for_update().await?;
        if !table.remove(&key.bucket()) {
            return Ok(false);
        }
        self.persist(&table).await?;
        Ok(true)
    }

    /// [`try_remove`](Self::try_remove), logging a failure.
    pub async fn remove(&self, key: &CacheKey) {
        if let Err(err) = self.try_remove(key).await {
            tracing::error!(key = %key, error = ?err, "Could not remove cache entry from index");
        }
    }

    async fn persist(&self, table: &HashTable) -> Result<()> {
        let document = table.to_yaml().or_raise(|| ErrorKind::IndexPersist)?;
        self.backend.write(&self.path, document.as_bytes()).await.or_raise(|| ErrorKind::IndexPersist)?;
        tracing::debug!(index = %self.path.display(), backend = self.backend.name(), "Persisted cache index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bru_storage::backend::{LocalBackend, MockBackend, StorageBackend};
    use std::sync::Arc;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_missing_document_is_empty() {
        let index = Index::new(Arc::new(MockBackend::default()), "bru");
        assert!(index.load().await.unwrap().is_empty());
        assert_eq!(index.path(), Path::new("bru_hashtable.yml"));
    }

    #[tokio::test]
    async fn test_corrupt_document_degrades() {
        let backend = Arc::new(MockBackend::with_files([("bru_hashtable.yml", "modules: [oops")]));
        let index = Index::new(backend, "bru");
        let err = index.load().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::IndexLoad));
        assert!(index.ensure().await.is_empty());
        assert_eq!(index.lookup(&key("modules/ask/mod.ts")).await, None);
    }

    #[tokio::test]
    async fn test_update_then_lookup() {
        let backend = Arc::new(MockBackend::default());
        let index = Index::new(backend.clone(), "bru");
        assert!(index.try_update(&key("modules/ask/mod.ts")).await.unwrap());
        assert_eq!(index.lookup(&key("modules/ask/mod.ts")).await, Some(PathBuf::from("modules/ask/mod.ts")));
        assert_eq!(index.lookup(&key("modules/ask/perm.ts")).await, None);

        // Persisted, so a fresh index over the same backend sees it.
        let reopened = Index::new(backend, "bru");
        assert!(reopened.lookup(&key("modules/ask/mod.ts")).await.is_some());
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let index = Index::new(Arc::new(MockBackend::default()), "bru");
        assert!(index.try_update(&key("modules/ask/mod.ts")).await.unwrap());
        assert!(!index.try_update(&key("modules/ask/mod.ts")).await.unwrap());
        let table = index.load().await.unwrap();
        assert_eq!(table.category("modules").unwrap()["ask"], vec!["mod.ts".to_string()]);
    }

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let readme = Index::new(backend.clone(), "creadme");
        let draft = Index::new(backend.clone(), "draft");
        readme.update(&key("modules/ask/mod.ts")).await;
        assert!(readme.lookup(&key("modules/ask/mod.ts")).await.is_some());
        assert!(draft.lookup(&key("modules/ask/mod.ts")).await.is_none());
        assert!(backend.exists(Path::new("creadme_hashtable.yml")).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_prunes() {
        let index = Index::new(Arc::new(MockBackend::default()), "bru");
        index.update(&key("docs/intro.md")).await;
        index.update(&key("modules/ask/mod.ts")).await;
        assert!(index.try_remove(&key("docs/intro.md")).await.unwrap());
        let table = index.load().await.unwrap();
        assert!(table.category("docs").is_none());
        assert!(table.category("modules").is_some());
        assert!(!index.try_remove(&key("docs/intro.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_persist_failure_is_logged() {
        let backend = Arc::new(MockBackend::default().with_denied(["bru_hashtable.yml"]));
        let index = Index::new(backend, "bru");
        let err = index.try_update(&key("modules/ask/mod.ts")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::IndexPersist));
        // The infallible variant carries on as if nothing happened.
        index.update(&key("modules/ask/mod.ts")).await;
        assert_eq!(index.lookup(&key("modules/ask/mod.ts")).await, None);
    }

    #[tokio::test]
    async fn test_failed_read_keeps_existing_entries() {
        let backend = Arc::new(MockBackend::default());
        let index = Index::new(backend.clone(), "bru");
        for i in 0..10 {
            index.update(&key(&format!("modules/m{i}/mod.ts"))).await;
        }
        let flaky = Arc::new(
            MockBackend::with_files([("bru_hashtable.yml", backend.read(index.path()).await.unwrap())])
                .with_failing_reads("bru_hashtable.yml", 2),
        );
        let index = Index::new(flaky, "bru");
        let err = index.try_update(&key("helpers/log.ts")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::IndexLoad));
        index.update(&key("helpers/log.ts")).await;

        assert_eq!(index.entries().await.len(), 10);
        assert!(index.try_update(&key("helpers/log.ts")).await.unwrap());
        assert_eq!(index.entries().await.len(), 11);
    }

    #[tokio::test]
    async fn test_update_replaces_corrupt_document() {
        let backend = Arc::new(MockBackend::with_files([("bru_hashtable.yml", "modules: [oops")]));
        let index = Index::new(backend, "bru");
        assert!(index.try_update(&key("modules/ask/mod.ts")).await.unwrap());
        assert_eq!(index.entries().await, vec![Bucket::derive("modules/ask/mod.ts")]);
    }

    #[tokio::test]
    async fn test_entries() {
        let index = Index::new(Arc::new(MockBackend::default()), "bru");
        index.update(&key("top.ts")).await;
        index.update(&key("modules/ask/mod.ts")).await;
        let keys: Vec<String> = index.entries().await.iter().map(Bucket::key).collect();
        assert_eq!(keys, vec!["modules/ask/mod.ts".to_string(), "top.ts".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let index = Arc::new(Index::new(Arc::new(MockBackend::default()), "bru"));
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let index = index.clone();
                tokio::spawn(async move { index.try_update(&key(&format!("modules/m{i}/mod.ts"))).await.unwrap() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(index.entries().await.len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_lookups_during_updates_see_whole_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new("cache", temp_dir.path()).unwrap());
        let document: String = (0..2000).fold(String::from("modules:\n"), |doc, i| doc + &format!("  m{i}:\n  - mod.ts\n"));
        backend.write(Path::new("bru_hashtable.yml"), document.as_bytes()).await.unwrap();
        let index = Arc::new(Index::new(backend, "bru"));

        let writer = {
            let index = index.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    index.try_update(&key(&format!("helpers/h{i}/log.ts"))).await.unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = index.clone();
                tokio::spawn(async move {
                    let mut misses = 0;
                    for _ in 0..100 {
                        if index.lookup(&key("modules/m0/mod.ts")).await.is_none() {
                            misses += 1;
                        }
                    }
                    misses
                })
            })
            .collect();
        writer.await.unwrap();
        for reader in readers {
            assert_eq!(reader.await.unwrap(), 0);
        }
        assert_eq!(index.entries().await.len(), 2100);
    }
}
