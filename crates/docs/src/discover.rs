//! Finding the source files to document.

use crate::error::{ErrorKind, Result};
use bru_cache::CacheKey;
use bru_storage::BackendHandle;
use exn::ResultExt;
use futures::TryStreamExt;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static TYPESCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.tsx?$").unwrap());

/// Files whose name matches `pattern`, minus the names in `skip`.
#[derive(Debug, Clone)]
pub struct Discovery {
    pattern: Regex,
    skip: Vec<String>,
}

impl Default for Discovery {
    /// TypeScript sources, skipping module permission manifests.
    fn default() -> Self {
        Self { pattern: TYPESCRIPT.clone(), skip: vec!["perm.ts".to_string()] }
    }
}

impl Discovery {
    pub fn new(pattern: &str, skip: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let pattern = Regex::new(pattern).or_raise(|| ErrorKind::InvalidPattern(pattern.to_string()))?;
        Ok(Self { pattern, skip: skip.into_iter().map(Into::into).collect() })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name) && !self.skip.iter().any(|s| s == file_name)
    }

    /// Cache keys of every matching file under the given directories of the
    /// working tree, sorted and without duplicates.
    pub async fn discover(&self, source: &BackendHandle, directories: &[String]) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        for directory in directories {
            let mut files = source.list_stream(Some(Path::new(directory)));
            while let Some(file) = files.try_next().await.or_raise(|| ErrorKind::Source)? {
                if !file.file_name().is_some_and(|name| self.matches(name)) {
                    continue;
                }
                let Some(path) = file.path.to_str() else {
                    tracing::warn!(path = %file.path.display(), "Skipping file with a non UTF-8 path");
                    continue;
                };
                keys.push(CacheKey::new(path).or_raise(|| ErrorKind::Source)?);
            }
        }
        keys.sort();
        keys.dedup();
        tracing::debug!(directories = directories.len(), files = keys.len(), "Discovered source files");
        Ok(keys)
    }
}
