//! The [`StorageBackend`] trait and its implementations.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Somewhere bru keeps files, addressed by paths relative to a root.
///
/// Every path goes through [`validate_path`](crate::validate_path) inside the
/// implementation, so callers can pass cache keys straight through.
///
/// ```
/// use std::path::Path;
/// use bru_storage::{backend::StorageBackend, error::Result};
///
/// async fn cached_length(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("modules/ask/mod.md");
///     match backend.exists(path).await? {
///         true => Ok(backend.stat(path).await?.size),
///         false => Ok(0),
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Label for log output.
    fn name(&self) -> &str;

    /// [`list_stream()`](Self::list_stream), collected.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Every file under `prefix`, or under the root when `None`.
    ///
    /// The prefix matches whole components, so `modules/ask` covers
    /// `modules/ask/mod.ts` but not `modules/asking/mod.ts`. A prefix with
    /// nothing under it is an empty stream, not an error.
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use bru_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("modules")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Fails with [`NotFound`](crate::error::ErrorKind::NotFound) for a
    /// missing file.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Creates or replaces a file, along with any missing parent directories.
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use bru_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// backend.write(Path::new("modules/ask/mod.mdx"), b"# Ask").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Fails with [`NotFound`](crate::error::ErrorKind::NotFound) for a
    /// missing file, which callers are free to treat as success.
    async fn delete(&self, path: &Path) -> Result<()>;

    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}
