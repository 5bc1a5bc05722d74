//! Publishing cached blobs into an output tree.
//!
//! The index decides what gets copied: every key filed under a selected
//! directory is translated through an [`ExtensionMap`] to find its blob,
//! which is then written to the same relative location on the output backend.

use crate::error::{ErrorKind, Result};
use crate::facade::Cache;
use crate::key::{Bucket, CacheKey, normalize_extension};
use async_stream::stream;
use bru_storage::BackendHandle;
use exn::{OptionExt, ResultExt};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Copies in flight at once within a single selected directory.
pub const MAX_COPY_CONCURRENCY: usize = 16;

/// Source extension to cached variant extension, e.g. `.ts` to `.mdx`.
///
/// Extensions without a mapping are copied as-is.
///
/// ```
/// use bru_cache::ExtensionMap;
///
/// let map: ExtensionMap = ".ts=.mdx".parse().unwrap();
/// assert_eq!(map.get(".ts"), ".mdx");
/// assert_eq!(map.get(".md"), ".md");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionMap(BTreeMap<String, String>);

impl ExtensionMap {
    pub fn with(mut self, from: &str, to: &str) -> Self {
        self.0.insert(normalize_extension(from), normalize_extension(to));
        self
    }

    pub fn get<'a>(&'a self, extension: &'a str) -> &'a str {
        self.0.get(extension).map_or(extension, String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for ExtensionMap {
    type Err = crate::error::Error;

    /// Comma-separated `from=to` pairs: `.ts=.mdx,.tsx=.mdx`.
    fn from_str(s: &str) -> Result<Self> {
        s.split(',').filter(|pair| !pair.trim().is_empty()).try_fold(Self::default(), |map, pair| {
            match pair.split_once('=').map(|(from, to)| (from.trim(), to.trim())) {
                Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok(map.with(from, to)),
                _ => exn::bail!(ErrorKind::InvalidExtensionMap(pair.to_string())),
            }
        })
    }
}

impl Extend<ExtensionMap> for ExtensionMap {
    fn extend<T: IntoIterator<Item = ExtensionMap>>(&mut self, iter: T) {
        for other in iter {
            self.0.extend(other.0);
        }
    }
}

/// Progress events emitted by [`copy_selected`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once, with the normalized
///    directories.
/// 2. [`DirectoryCopied`](Self::DirectoryCopied), once per selected
///    directory, in selection order.
/// 3. [`Complete`](Self::Complete), exactly once, with the run's totals.
///
/// A fatal error ends the stream early with an `Err` item, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyEvent {
    Started(Vec<String>),
    DirectoryCopied { directory: String, copied: u64, skipped: u64 },
    Complete(CopySummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub directories: u64,
    pub copied: u64,
    /// Indexed entries whose blob was missing.
    pub skipped: u64,
}

enum Outcome {
    Copied,
    Skipped,
}

/// Turns a selected directory into the index path it refers to.
///
/// Absolute paths must lie under `working_root`.
pub fn normalize_directory(working_root: &Path, directory: &Path) -> Result<String> {
    let invalid = || ErrorKind::InvalidKey(directory.display().to_string());
    let relative = match directory.is_absolute() {
        true => directory.strip_prefix(working_root).or_raise(invalid)?,
        false => directory,
    };
    let relative = relative.to_str().ok_or_raise(invalid)?;
    Ok(CacheKey::new(relative)?.as_str().to_string())
}

/// Whether a bucket is filed under a normalized directory such as `modules`
/// or `modules/ask`.
fn selects(directory: &str, bucket: &Bucket) -> bool {
    let (category, rest) = directory.split_once('/').unwrap_or((directory, ""));
    bucket.category == category
        && (rest.is_empty()
            || bucket.subdirectory == rest
            || bucket.subdirectory.strip_prefix(rest).is_some_and(|tail| tail.starts_with('/')))
}

/// Streams [`CopyEvent`]s while copying every cached entry under `selected`
/// from `cache` into `output`.
///
/// The index is read once per call. Within a directory, up to
/// [`MAX_COPY_CONCURRENCY`] copies run at a time; directories are handled one
/// after another. A blob that is missing is logged and counted as skipped.
/// Any other failure is fatal.
///
/// ```no_run
/// use bru_cache::{Cache, CopyEvent, ExtensionMap, copy_selected};
/// use bru_storage::{BackendHandle, backend::LocalBackend};
/// use futures::TryStreamExt;
/// use std::path::{Path, PathBuf};
/// use std::sync::Arc;
///
/// # async fn example(cache: &Cache) -> bru_cache::error::Result<()> {
/// let output: BackendHandle = Arc::new(LocalBackend::new("docs", "/home/me/site/docs").unwrap());
/// let map = ExtensionMap::default().with(".ts", ".mdx");
/// let selected = vec![PathBuf::from("modules")];
/// let stream = copy_selected(cache, &output, Path::new("/home/me/project"), &selected, &map);
/// futures::pin_mut!(stream);
/// while let Some(event) = stream.try_next().await? {
///     if let CopyEvent::Complete(summary) = event {
///         println!("{} copied, {} skipped", summary.copied, summary.skipped);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn copy_selected<'a>(
    cache: &'a Cache,
    output: &'a BackendHandle,
    working_root: &'a Path,
    selected: &'a [PathBuf],
    map: &'a ExtensionMap,
) -> impl Stream<Item = Result<CopyEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let directories = match selected.iter().map(|d| normalize_directory(working_root, d)).collect::<Result<Vec<_>>>() {
            Ok(directories) => directories,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(CopyEvent::Started(directories.clone()));

        let entries = cache.entries().await;
        let mut summary = CopySummary::default();
        for directory in directories {
            let mut futures: Vec<_> = entries
                .iter()
                .filter(|bucket| selects(&directory, bucket))
                .map(|bucket| copy_entry(cache, output, bucket, map))
                .collect();
            let (mut copied, mut skipped) = (0, 0);
            let mut processing = FuturesUnordered::new();
            processing.extend(futures.drain(..MAX_COPY_CONCURRENCY.min(futures.len())));
            while let Some(result) = processing.next().await {
                match result {
                    Ok(Outcome::Copied) => copied += 1,
                    Ok(Outcome::Skipped) => skipped += 1,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
                if !futures.is_empty() {
                    processing.push(futures.remove(0));
                }
            }
            tracing::info!(directory = %directory, copied, skipped, "Copied cached files");
            summary.directories += 1;
            summary.copied += copied;
            summary.skipped += skipped;
            yield Ok(CopyEvent::DirectoryCopied { directory, copied, skipped });
        }

        yield Ok(CopyEvent::Complete(summary));
    })
}

fn blob_path(key: &CacheKey, map: &ExtensionMap) -> PathBuf {
    match key.extension() {
        Some(extension) => key.blob_path(map.get(extension)),
        None => PathBuf::from(key.as_str()),
    }
}

/// Picks the key behind a bucket, looking at which blob is actually a file
/// when more than one key derives it.
async fn resolve(cache: &Cache, bucket: &Bucket, map: &ExtensionMap) -> Result<Option<(CacheKey, PathBuf)>> {
    let candidates = bucket.candidates();
    if let [only] = candidates.as_slice() {
        let key = CacheKey::new(only)?;
        let path = blob_path(&key, map);
        return Ok(Some((key, path)));
    }
    for candidate in candidates {
        let key = CacheKey::new(candidate)?;
        let path = blob_path(&key, map);
        let listed = cache.backend().list(Some(path.as_path())).await.or_raise(|| ErrorKind::Storage)?;
        if listed.iter().any(|info| info.path == path) {
            return Ok(Some((key, path)));
        }
    }
    Ok(None)
}

async fn copy_entry(cache: &Cache, output: &BackendHandle, bucket: &Bucket, map: &ExtensionMap) -> Result<Outcome> {
    let Some((key, path)) = resolve(cache, bucket, map).await? else {
        tracing::warn!(key = %bucket.key(), "No cached file for ambiguous entry; skipping");
        return Ok(Outcome::Skipped);
    };
    let content = match cache.backend().read(&path).await {
        Ok(content) => content,
        Err(err) if err.is_not_found() => {
            tracing::warn!(key = %key, blob = %path.display(), "Cached file not found; skipping");
            return Ok(Outcome::Skipped);
        },
        Err(err) => return Err(err).or_raise(|| ErrorKind::Storage),
    };
    output.write(&path, &content).await.or_raise(|| ErrorKind::Storage)?;
    tracing::debug!(key = %key, destination = %path.display(), target = output.name(), "Copied cached file");
    Ok(Outcome::Copied)
}
