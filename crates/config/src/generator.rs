//! Per-namespace generator settings, remembered between runs.
//!
//! Each generator keeps a `<name>_config.yml` document in the cache root so
//! that answers given on one run (output directory, selected directories)
//! become the defaults for the next.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Format, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[display("yarn")]
    Yarn,
    #[display("npm")]
    Npm,
    #[display("pnpm")]
    Pnpm,
}

/// Contents of a `<name>_config.yml` document. Every field is optional, and
/// unset fields are left out of the written document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "selectedDirectories")]
    pub selected_dirs: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<PackageManager>,
}

impl GeneratorConfig {
    /// Location of the document for `name` under the cache root.
    pub fn path(cache_root: &Path, name: &str) -> PathBuf {
        cache_root.join(format!("{name}_config.yml"))
    }

    /// Reads the document. A missing document is the empty config.
    pub fn try_read(cache_root: &Path, name: &str) -> Result<Self> {
        let path = Self::path(cache_root, name);
        Figment::from(Yaml::file(&path)).extract().or_raise(|| ErrorKind::Parse(path.clone()))
    }

    /// Like [`try_read`](Self::try_read), but an unparsable document is
    /// logged and treated as empty.
    pub fn read(cache_root: &Path, name: &str) -> Self {
        Self::try_read(cache_root, name).unwrap_or_else(|err| {
            tracing::warn!(name, error = ?err, "Ignoring unreadable generator config");
            Self::default()
        })
    }

    /// Writes the whole document, creating the cache root if needed.
    pub async fn write(&self, cache_root: &Path, name: &str) -> Result<()> {
        let path = Self::path(cache_root, name);
        let failed = || ErrorKind::Write(path.clone());
        let document = serde_yaml::to_string(self).or_raise(failed)?;
        fs::create_dir_all(cache_root).await.or_raise(failed)?;
        fs::write(&path, document).await.or_raise(failed)?;
        tracing::debug!(path = %path.display(), "Wrote generator config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    #[test]
    fn test_missing_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(GeneratorConfig::try_read(temp_dir.path(), "draft").unwrap(), GeneratorConfig::default());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = tempfile::tempdir().unwrap();
        let cache_root = temp_dir.path().join(".cache");
        let config = GeneratorConfig {
            output_dir: Some(PathBuf::from("site/docs")),
            selected_dirs: Some(vec![PathBuf::from("modules"), PathBuf::from("helpers")]),
            manager: Some(PackageManager::Pnpm),
            ..Default::default()
        };
        config.write(&cache_root, "draft").await.unwrap();
        assert!(cache_root.join("draft_config.yml").is_file());
        assert_eq!(GeneratorConfig::read(&cache_root, "draft"), config);
        // Namespaces don't share documents.
        assert_eq!(GeneratorConfig::read(&cache_root, "creadme"), GeneratorConfig::default());
    }

    #[tokio::test]
    async fn test_camel_case_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig { output_dir: Some(PathBuf::from("out")), ..Default::default() };
        config.write(temp_dir.path(), "creadme").await.unwrap();
        let document = fs::read_to_string(temp_dir.path().join("creadme_config.yml")).unwrap();
        assert_eq!(document, "outputDir: out\n");
    }

    #[rstest]
    #[case("cloneDir: /tmp/clone\ndirName: docs\ntemplate: starlight\nmanager: yarn\n")]
    #[case("selectedDirs:\n  - modules\n  - helpers\n")]
    fn test_reads_documents(#[case] document: &str) {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("bru_config.yml"), document).unwrap();
        assert_ne!(GeneratorConfig::try_read(temp_dir.path(), "bru").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_reads_older_selection_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("draft_config.yml"), "selectedDirectories:\n  - modules\n").unwrap();
        let config = GeneratorConfig::try_read(temp_dir.path(), "draft").unwrap();
        assert_eq!(config.selected_dirs, Some(vec![PathBuf::from("modules")]));
    }

    #[test]
    fn test_corrupt_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("bru_config.yml"), "manager: bun\n").unwrap();
        let err = GeneratorConfig::try_read(temp_dir.path(), "bru").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse(_)));
        assert_eq!(GeneratorConfig::read(temp_dir.path(), "bru"), GeneratorConfig::default());
    }
}
