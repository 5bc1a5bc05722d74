//! In-memory storage for tests.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_trait::async_trait;
use exn::OptionExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    modified: OffsetDateTime,
    data: Vec<u8>,
}

impl Entry {
    fn new(data: Vec<u8>) -> Self {
        Self { modified: OffsetDateTime::now_utc(), data }
    }

    fn info(&self, path: &Path) -> FileInfo {
        FileInfo::new(path, self.data.len() as u64, self.modified)
    }
}

/// A [`StorageBackend`] over an in-memory map, listed in path order.
///
/// Paths passed to [`with_denied()`](Self::with_denied) fail reads, writes
/// and deletes with [`PermissionDenied`](ErrorKind::PermissionDenied) while
/// still showing up in `exists`, `stat` and listings. That is how tests make a
/// blob or an index document impossible to remove or persist.
///
/// Paths passed to [`with_failing_reads()`](Self::with_failing_reads) fail
/// that many reads with an [`Io`](ErrorKind::Io) error before reading
/// normally again.
///
/// ```
/// use bru_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([("modules/ask/mod.md", "# Ask")]).with_denied(["bru_hashtable.yml"]);
/// assert!(backend.exists(Path::new("modules/ask/mod.md")).await?);
/// assert!(backend.write(Path::new("bru_hashtable.yml"), b"{}").await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    files: RwLock<BTreeMap<PathBuf, Entry>>,
    denied: HashSet<PathBuf>,
    failing_reads: Mutex<HashMap<PathBuf, usize>>,
}

impl MockBackend {
    /// Panics on a path that fails validation: broken test setup.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let files = files.into_iter().map(|(path, data)| (Self::checked(path.into()), Entry::new(data.into())));
        Self {
            name: "mock".to_string(),
            files: RwLock::new(files.collect()),
            denied: HashSet::new(),
            failing_reads: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_denied(mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.denied.extend(paths.into_iter().map(|path| Self::checked(path.into())));
        self
    }

    pub fn with_failing_reads(self, path: impl Into<PathBuf>, times: usize) -> Self {
        if let Ok(mut failing) = self.failing_reads.lock() {
            failing.insert(Self::checked(path.into()), times);
        }
        self
    }

    fn checked(path: PathBuf) -> PathBuf {
        match validate_path(&path) {
            Ok(path) => path,
            Err(_) => panic!("MockBackend: invalid path {}", path.display()),
        }
    }

    /// Whether this read of `path` should fail, counting it down if so.
    fn take_read_failure(&self, path: &Path) -> bool {
        let Ok(mut failing) = self.failing_reads.lock() else {
            return false;
        };
        match failing.get_mut(path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            },
            _ => false,
        }
    }

    /// Validates `path` and refuses denied ones.
    fn permitted(&self, path: &Path) -> Result<PathBuf> {
        let path = validate_path(path)?;
        match self.denied.contains(&path) {
            true => exn::bail!(ErrorKind::PermissionDenied(path)),
            false => Ok(path),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(Vec::<(PathBuf, Vec<u8>)>::new())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let listing = async move {
            let prefix = prefix.map(validate_path).transpose()?;
            let files = self.files.read().await;
            let listed: Vec<Result<FileInfo>> = files
                .iter()
                .filter(|(path, _)| prefix.as_deref().is_none_or(|p| path.starts_with(p)))
                .map(|(path, entry)| Ok(entry.info(path)))
                .collect();
            Result::Ok(futures::stream::iter(listed))
        };
        Box::pin(futures::TryStreamExt::try_flatten(futures::stream::once(listing)))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.permitted(path)?;
        if self.take_read_failure(&path) {
            exn::bail!(ErrorKind::Io(IoError::other("injected read failure")));
        }
        let files = self.files.read().await;
        let entry = files.get(&path).ok_or_raise(|| ErrorKind::NotFound(path.clone()))?;
        Ok(entry.data.clone())
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = self.permitted(path)?;
        self.files.write().await.insert(path, Entry::new(data.to_vec()));
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = self.permitted(path)?;
        match self.files.write().await.remove(&path) {
            Some(_) => Ok(()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let files = self.files.read().await;
        let entry = files.get(&path).ok_or_raise(|| ErrorKind::NotFound(path.clone()))?;
        Ok(entry.info(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MockBackend {
        MockBackend::with_files([
            ("modules/ask/mod.md", "ask"),
            ("modules/ask/perm.md", "perm"),
            ("modules/asking/mod.md", "asking"),
            ("helpers/log.md", "log"),
        ])
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let backend = MockBackend::default();
        let path = Path::new("modules/ask/mod.md");
        assert!(!backend.exists(path).await.unwrap());
        backend.write(path, b"12345").await.unwrap();
        assert_eq!(backend.read(path).await.unwrap(), b"12345");
        assert_eq!(backend.stat(path).await.unwrap().size, 5);
        backend.delete(path).await.unwrap();
        assert!(backend.read(path).await.unwrap_err().is_not_found());
        assert!(backend.delete(path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list() {
        let backend = backend();
        let paths = |files: Vec<FileInfo>| files.into_iter().map(|f| f.path).collect::<Vec<_>>();
        assert_eq!(backend.list(None).await.unwrap().len(), 4);
        assert_eq!(
            paths(backend.list(Some(Path::new("modules/ask"))).await.unwrap()),
            vec![PathBuf::from("modules/ask/mod.md"), PathBuf::from("modules/ask/perm.md")]
        );
        assert!(backend.list(Some(Path::new("../escape"))).await.is_err());
    }

    #[tokio::test]
    async fn test_denied_paths() {
        let backend = backend().with_denied(["helpers/log.md"]);
        let path = Path::new("helpers/log.md");
        assert!(matches!(&*backend.read(path).await.unwrap_err(), ErrorKind::PermissionDenied(_)));
        assert!(matches!(&*backend.write(path, b"y").await.unwrap_err(), ErrorKind::PermissionDenied(_)));
        assert!(matches!(&*backend.delete(path).await.unwrap_err(), ErrorKind::PermissionDenied(_)));
        assert!(backend.exists(path).await.unwrap());
        assert_eq!(backend.stat(path).await.unwrap().size, 3);
    }

    #[tokio::test]
    async fn test_failing_reads() {
        let backend = backend().with_failing_reads("helpers/log.md", 1);
        let path = Path::new("helpers/log.md");
        let err = backend.read(path).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.read(path).await.unwrap(), b"log");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", "bad")]);
    }
}
