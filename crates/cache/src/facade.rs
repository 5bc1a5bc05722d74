use crate::error::{ErrorKind, Result};
use crate::index::Index;
use crate::key::{Bucket, CacheKey};
use crate::store::Store;
use bru_storage::BackendHandle;
use bru_storage::backend::LocalBackend;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Outcome of [`Cache::check_and_read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached {
    Hit(String),
    /// Not in the index, or in the index but the blob is unreadable.
    Miss,
}
impl Cached {
    pub fn into_hit(self) -> Option<String> {
        match self {
            Self::Hit(content) => Some(content),
            Self::Miss => None,
        }
    }
}

/// Outcome of [`Cache::invalidate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidated {
    /// The blob was deleted.
    Removed,
    /// There was no blob to delete; any stale index entry has been dropped.
    AlreadyAbsent,
}

/// The cache as generators see it: index and blob store kept in step.
///
/// ```no_run
/// use bru_cache::{Cache, Cached};
///
/// # async fn example() -> bru_cache::error::Result<()> {
/// let cache = Cache::open("/home/me/project/.cache", "bru")?;
/// let key = bru_cache::CacheKey::new("modules/ask/mod.ts")?;
/// let summary = match cache.check_and_read(&key, ".md").await {
///     Cached::Hit(summary) => summary,
///     Cached::Miss => {
///         let summary = String::from("Asks a question.");
///         cache.write_through(&key, &summary, ".md").await?;
///         summary
///     },
/// };
/// # Ok(())
/// # }
/// ```
pub struct Cache {
    store: Store,
    index: Index,
}

impl Cache {
    /// Index and blobs both live on `backend`, the index as
    /// `<namespace>_hashtable.yml` at its root.
    pub fn new(backend: BackendHandle, namespace: &str) -> Self {
        Self {
            store: Store::new(backend.clone()),
            index: Index::new(backend, namespace),
        }
    }

    /// A cache rooted at `cache_root` on the local filesystem, created if
    /// missing.
    pub fn open(cache_root: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let backend = LocalBackend::new("cache", cache_root.as_ref()).or_raise(|| ErrorKind::Storage)?;
        Ok(Self::new(Arc::new(backend), namespace))
    }

    pub fn backend(&self) -> &BackendHandle {
        self.store.backend()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Existence check without reading the blob.
    pub async fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        self.index.lookup(key).await
    }

    /// Every key currently filed in the index.
    pub async fn entries(&self) -> Vec<Bucket> {
        self.index.entries().await
    }

    /// Reads the blob if, and only if, the index says it exists.
    #[instrument(level = "debug", skip_all, fields(key = %key, extension = extension))]
    pub async fn check_and_read(&self, key: &CacheKey, extension: &str) -> Cached {
        if self.index.lookup(key).await.is_none() {
            tracing::debug!("Not in cache index");
            return Cached::Miss;
        }
        match self.store.read(key, extension).await {
            Ok(content) => Cached::Hit(content),
            Err(err) => {
                tracing::debug!(error = ?err, "Indexed but blob unreadable");
                Cached::Miss
            },
        }
    }

    /// Writes the blob, then files the key in the index.
    ///
    /// A failure to write the blob is returned and the index is not touched.
    /// A failure to update the index is logged only.
    #[instrument(level = "debug", skip_all, fields(key = %key, extension = extension))]
    pub async fn write_through(&self, key: &CacheKey, content: &str, extension: &str) -> Result<()> {
        self.store.write(key, content, extension).await?;
        self.index.update(key).await;
        Ok(())
    }

    /// Deletes the blob, then removes only this key's filename from the
    /// index. Other keys in the same directory stay cached.
    ///
    /// Returns [`RemovalFailed`](ErrorKind::RemovalFailed) if the blob exists
    /// but cannot be deleted, leaving the index untouched.
    #[instrument(level = "debug", skip_all, fields(key = %key, extension = extension))]
    pub async fn invalidate(&self, key: &CacheKey, extension: &str) -> Result<Invalidated> {
        let outcome = match self.store.remove(key, extension).await {
            Ok(()) => Invalidated::Removed,
            Err(err) if err.is_miss() => Invalidated::AlreadyAbsent,
            Err(err) => return Err(err),
        };
        self.index.remove(key).await;
        tracing::info!(key = %key, ?outcome, "Invalidated cache entry");
        Ok(outcome)
    }
}
