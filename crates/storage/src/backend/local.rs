//! Storage on the local filesystem, through `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::{Error, ErrorKind, Result};
use crate::{FileInfo, StorageBackend, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Files under an absolute root directory.
///
/// The cache root, the working tree and output trees are each one of these.
///
/// ```no_run
/// use bru_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = LocalBackend::new("cache", "/home/me/project/.cache")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}

impl LocalBackend {
    /// Opens `root`, creating it when missing.
    ///
    /// Fails with [`InvalidPath`](ErrorKind::InvalidPath) if `root` is
    /// relative or is something other than a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root.to_path_buf()));
        }
        if !root.exists() {
            // Blocking is fine: this runs once per backend, before any I/O.
            std::fs::create_dir_all(root).map_err(|err| io_error(err, root))?;
            tracing::debug!(root = %root.display(), "Created storage root");
        }
        Ok(Self { name: name.into(), root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a backend-relative path.
    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path)?))
    }

    /// Backend-relative path of a filesystem location found while walking.
    fn relative(&self, absolute: &Path) -> Result<PathBuf> {
        match absolute.strip_prefix(&self.root) {
            Ok(relative) => validate_path(relative),
            Err(_) => exn::bail!(ErrorKind::OutsideRoot(absolute.to_path_buf())),
        }
    }

    /// One directory's entries with their metadata. A missing directory has
    /// no entries.
    async fn read_dir(&self, dir: &Path) -> Result<Vec<(PathBuf, Metadata)>> {
        let mut reader = match fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(err, dir)),
        };
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|err| io_error(err, dir))? {
            let path = entry.path();
            let metadata = entry.metadata().await.map_err(|err| io_error(err, &path))?;
            entries.push((path, metadata));
        }
        Ok(entries)
    }
}

fn io_error(err: io::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io(err),
    };
    Error::from(kind)
}

fn file_info(path: PathBuf, metadata: &Metadata) -> Result<FileInfo> {
    let modified = metadata.modified().map_err(|err| io_error(err, &path))?;
    Ok(FileInfo::new(path, metadata.len(), modified.into()))
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        Box::pin(stream!({
            let prefix = match prefix.map(validate_path).transpose() {
                Ok(prefix) => prefix,
                Err(err) => {
                    yield Err(err);
                    return;
                },
            };
            let mut pending = VecDeque::from([self.root.clone()]);
            while let Some(dir) = pending.pop_front() {
                let entries = match self.read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(err);
                        continue;
                    },
                };
                for (path, metadata) in entries {
                    let relative = match self.relative(&path) {
                        Ok(relative) => relative,
                        Err(err) => {
                            yield Err(err);
                            continue;
                        },
                    };
                    let wanted = prefix.as_deref().is_none_or(|p| relative.starts_with(p));
                    if metadata.is_dir() {
                        // Directories above the prefix still lead to it.
                        if wanted || prefix.as_deref().is_some_and(|p| p.starts_with(&relative)) {
                            pending.push_back(path);
                        }
                    } else if metadata.is_file() && wanted {
                        yield file_info(relative, &metadata);
                    }
                }
            }
        }))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let absolute = self.resolve(path)?;
        fs::try_exists(&absolute).await.map_err(|err| io_error(err, path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let absolute = self.resolve(path)?;
        fs::read(&absolute).await.map_err(|err| io_error(err, path))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let absolute = self.resolve(path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await.map_err(|err| io_error(err, path))?;
        }
        fs::write(&absolute, data).await.map_err(|err| io_error(err, path))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let absolute = self.resolve(path)?;
        fs::remove_file(&absolute).await.map_err(|err| io_error(err, path))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let absolute = self.resolve(path)?;
        let metadata = fs::metadata(&absolute).await.map_err(|err| io_error(err, path))?;
        file_info(validate_path(path)?, &metadata)
    }
}
