//! Documentation generators backed by the bru cache.
//!
//! Both generators walk the selected directories of the working tree, ask a
//! [`Generator`] to describe every matching source file, and memoize each
//! answer in the cache under the file's relative path:
//! - [`readme()`] collects per-file summaries (`.md`) into one `README.md`.
//! - [`draft()`] writes per-file MDX pages (`.mdx`) and publishes them into a
//!   documentation site's content directory.
//!
//! Answers given on one run (output directory, selected directories) are
//! remembered in a per-generator config document for the next.

mod discover;
mod draft;
pub mod error;
mod generator;
mod memo;
mod readme;
pub mod text;

pub use crate::discover::Discovery;
pub use crate::draft::{DRAFT_CONFIG, DraftReport, MDX_EXTENSION, draft};
pub use crate::generator::{CommandGenerator, Generator, Request};
pub use crate::memo::{Memoized, memoize};
pub use crate::readme::{README_CONFIG, ReadmeReport, SUMMARY_EXTENSION, readme};
use crate::error::{ErrorKind, Result};
use bru_cache::{Cache, CacheKey, Invalidated, normalize_directory};
use bru_config::Settings;
use bru_storage::BackendHandle;
use bru_storage::backend::LocalBackend;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source files described at once.
pub const MAX_GENERATE_CONCURRENCY: usize = 4;

/// Per-run choices. Unset values fall back to the generator's remembered
/// config.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub output_dir: Option<PathBuf>,
    pub selected_dirs: Vec<PathBuf>,
    /// Cache key to invalidate before generating.
    pub cache_remove: Option<String>,
}

/// The working tree a generator runs against.
pub struct Workspace {
    root: PathBuf,
    cache_root: PathBuf,
    name: String,
    source: BackendHandle,
    cache: Cache,
    discovery: Discovery,
}

impl Workspace {
    /// Opens the working tree at `root` (absolute) with the cache described
    /// by `settings`.
    pub fn open(root: &Path, settings: &Settings) -> Result<Self> {
        let cache_root = settings.cache_root(root);
        let source = LocalBackend::new("workspace", root).or_raise(|| ErrorKind::Source)?;
        let cache = Cache::open(&cache_root, &settings.namespace).or_raise(|| ErrorKind::Cache)?;
        Ok(Self {
            root: root.to_path_buf(),
            cache_root,
            name: settings.namespace.clone(),
            source: Arc::new(source),
            cache,
            discovery: Discovery::default(),
        })
    }

    pub fn with_discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Namespace of the cache index, also credited in generated output.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) async fn read_source(&self, key: &CacheKey) -> Result<String> {
        let bytes = self.source.read(Path::new(key.as_str())).await.or_raise(|| ErrorKind::Source)?;
        String::from_utf8(bytes).or_raise(|| ErrorKind::Source)
    }

    /// Discovers files under already-normalized directories.
    pub(crate) async fn discover(&self, directories: &[String]) -> Result<Vec<CacheKey>> {
        self.discovery.discover(&self.source, directories).await
    }

    pub(crate) fn normalize(&self, selected: &[PathBuf]) -> Result<Vec<String>> {
        selected
            .iter()
            .map(|dir| normalize_directory(&self.root, dir).or_raise(|| ErrorKind::Source))
            .collect()
    }

    /// Local backend rooted at `directory`, relative to the working root
    /// unless absolute.
    pub(crate) fn output(&self, directory: &Path) -> Result<(PathBuf, BackendHandle)> {
        let root = self.root.join(directory);
        let backend = LocalBackend::new("output", &root).or_raise(|| ErrorKind::Output(root.clone()))?;
        Ok((root, Arc::new(backend)))
    }

    /// Handles `--cache-remove`. Failures are reported, never returned.
    pub(crate) async fn remove_requested(&self, raw: &str, extension: &str) -> Option<Invalidated> {
        let outcome = match CacheKey::new(raw) {
            Ok(key) => self.cache.invalidate(&key, extension).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(outcome) => {
                tracing::info!(key = raw, ?outcome, "Removed from cache");
                Some(outcome)
            },
            Err(err) => {
                tracing::error!(key = raw, error = ?err, "Error removing file from cache");
                None
            },
        }
    }
}

/// Directories for this run: the ones given, else the remembered ones.
pub(crate) fn selected_dirs(given: Vec<PathBuf>, remembered: Option<Vec<PathBuf>>) -> Result<Vec<PathBuf>> {
    match (given.is_empty(), remembered) {
        (false, _) => Ok(given),
        (true, Some(remembered)) if !remembered.is_empty() => Ok(remembered),
        _ => exn::bail!(ErrorKind::NoDirectories),
    }
}

/// `modules/ask/mod.ts` -> `mod`.
pub(crate) fn module_stem(key: &CacheKey) -> &str {
    let name = key.file_name();
    name.strip_suffix(".tsx").or_else(|| name.strip_suffix(".ts")).unwrap_or(name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every request with a canned reply and records the prompts.
    #[derive(Default)]
    pub(crate) struct ScriptedGenerator {
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, request: &Request) -> Result<String> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt.clone());
            Ok(format!("Generated text #{}.", prompts.len()))
        }
    }

    impl ScriptedGenerator {
        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    /// A working tree with a handful of TypeScript modules.
    pub(crate) fn workspace() -> (tempfile::TempDir, Workspace) {
        let temp_dir = tempfile::tempdir().unwrap();
        let files = [
            ("modules/ask/mod.ts", "export const ask = () => 'hi'\n"),
            ("modules/ask/perm.ts", "export default {}\n"),
            ("modules/create_readme/mod.ts", "export const readme = 1\n"),
            ("helpers/log.ts", "export const log = console.log\n"),
        ];
        for (path, content) in files {
            let path = temp_dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        let workspace = Workspace::open(temp_dir.path(), &Settings::default()).unwrap();
        (temp_dir, workspace)
    }

    #[test]
    fn test_selected_dirs() {
        let given = vec![PathBuf::from("modules")];
        assert_eq!(selected_dirs(given.clone(), None).unwrap(), given);
        assert_eq!(selected_dirs(vec![], Some(given.clone())).unwrap(), given);
        let err = selected_dirs(vec![], Some(vec![])).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NoDirectories));
    }

    #[test]
    fn test_module_stem() {
        assert_eq!(module_stem(&CacheKey::new("modules/ask/mod.ts").unwrap()), "mod");
        assert_eq!(module_stem(&CacheKey::new("ui/page.tsx").unwrap()), "page");
        assert_eq!(module_stem(&CacheKey::new("docs/intro.md").unwrap()), "intro.md");
    }

    #[tokio::test]
    async fn test_remove_requested() {
        let (_temp_dir, workspace) = workspace();
        let key = CacheKey::new("modules/ask/mod.ts").unwrap();
        workspace.cache().write_through(&key, "cached", ".md").await.unwrap();
        assert_eq!(workspace.remove_requested("modules/ask/mod.ts", ".md").await, Some(Invalidated::Removed));
        assert_eq!(workspace.remove_requested("modules/ask/mod.ts", ".md").await, Some(Invalidated::AlreadyAbsent));
        assert_eq!(workspace.remove_requested("../outside.ts", ".md").await, None);
    }
}
