//! Cache keys and their index buckets.
//!
//! A key is the path of a source file relative to the working root, used
//! verbatim as a path fragment under the cache root. The index files each key
//! under a `category -> subdirectory -> filename` bucket derived by
//! [`Bucket::derive`].

use crate::error::{ErrorKind, Result};
use bru_storage::validate_path;
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};

/// A validated cache key such as `modules/ask/mod.ts`.
///
/// Construction normalizes the path (`./a//b` becomes `a/b`) and rejects
/// anything that would escape the cache root.
///
/// ```
/// use bru_cache::CacheKey;
///
/// let key = CacheKey::new("./modules/ask/mod.ts").unwrap();
/// assert_eq!(key.as_str(), "modules/ask/mod.ts");
/// assert!(CacheKey::new("../secrets.ts").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let raw = key.as_ref();
        let invalid = || ErrorKind::InvalidKey(raw.to_string());
        let path = validate_path(raw).or_raise(invalid)?;
        let segments = path.iter().map(|s| s.to_str()).collect::<Option<Vec<_>>>().ok_or_raise(invalid)?;
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index bucket this key is filed under.
    pub fn bucket(&self) -> Bucket {
        Bucket::derive(&self.0)
    }

    /// Final path segment, the name stored in the index.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Directory part of the key, empty for single-segment keys.
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    /// Extension of the key's own file name, including the leading dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(i) => Some(&name[i..]),
        }
    }

    /// Location of the blob for this key under the cache root.
    ///
    /// The key's own extension is replaced by the variant extension, so
    /// `modules/ask/mod.ts` with `.md` lives at `modules/ask/mod.md`.
    ///
    /// ```
    /// use bru_cache::CacheKey;
    /// use std::path::Path;
    ///
    /// let key = CacheKey::new("modules/ask/mod.ts").unwrap();
    /// assert_eq!(key.blob_path(".mdx"), Path::new("modules/ask/mod.mdx"));
    /// assert_eq!(key.blob_path("md"), Path::new("modules/ask/mod.md"));
    /// ```
    pub fn blob_path(&self, extension: &str) -> PathBuf {
        let name = self.file_name();
        let stem = self.extension().map_or(name, |ext| &name[..name.len() - ext.len()]);
        let blob = format!("{stem}{}", normalize_extension(extension));
        Path::new(self.parent()).join(blob)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Variant extensions are accepted with or without their leading dot.
pub(crate) fn normalize_extension(extension: &str) -> String {
    match extension.strip_prefix('.') {
        Some(_) => extension.to_string(),
        None => format!(".{extension}"),
    }
}

/// Position of a key inside the hash-table index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// First path segment.
    pub category: String,
    /// Segments between the first and the last, possibly empty.
    pub subdirectory: String,
    /// Last path segment.
    pub filename: String,
}

impl Bucket {
    /// Splits a key on `/` into its bucket.
    ///
    /// A single-segment key is both the category and the filename, with an
    /// empty subdirectory.
    ///
    /// ```
    /// use bru_cache::Bucket;
    ///
    /// let bucket = Bucket::derive("modules/ask/mod.ts");
    /// assert_eq!(bucket.category, "modules");
    /// assert_eq!(bucket.subdirectory, "ask");
    /// assert_eq!(bucket.filename, "mod.ts");
    /// ```
    pub fn derive(key: &str) -> Self {
        let segments: Vec<&str> = key.split('/').collect();
        let category = segments.first().copied().unwrap_or_default();
        let filename = segments.last().copied().unwrap_or_default();
        let subdirectory = match segments.len() {
            0..=2 => String::new(),
            n => segments[1..n - 1].join("/"),
        };
        Self { category: category.to_string(), subdirectory, filename: filename.to_string() }
    }

    /// Rebuilds the key this bucket was derived from.
    ///
    /// `a/a` and `a` derive the same bucket; the single-segment form wins.
    /// Use [`candidates`](Self::candidates) where that matters.
    pub fn key(&self) -> String {
        match (self.subdirectory.is_empty(), self.category == self.filename) {
            (true, true) => self.filename.clone(),
            (true, false) => format!("{}/{}", self.category, self.filename),
            (false, _) => format!("{}/{}/{}", self.category, self.subdirectory, self.filename),
        }
    }

    /// Every key that derives this bucket, [`key`](Self::key) first.
    ///
    /// ```
    /// use bru_cache::Bucket;
    ///
    /// assert_eq!(Bucket::derive("docs/docs").candidates(), vec!["docs", "docs/docs"]);
    /// assert_eq!(Bucket::derive("docs/intro.md").candidates(), vec!["docs/intro.md"]);
    /// ```
    pub fn candidates(&self) -> Vec<String> {
        match self.subdirectory.is_empty() && self.category == self.filename {
            true => vec![self.key(), format!("{}/{}", self.category, self.filename)],
            false => vec![self.key()],
        }
    }
}
