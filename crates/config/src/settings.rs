use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable the namespace has always been read from.
pub const NAMESPACE_ENV: &str = "NAME";
/// Prefix for every other environment override, e.g. `BRU_CACHE_DIR`.
pub const ENV_PREFIX: &str = "BRU_";

/// Tool-wide settings.
///
/// Sources, lowest priority first:
/// 1. built-in defaults,
/// 2. `bru.yml` then `bru.toml` in the working root,
/// 3. the `NAME` environment variable (namespace only),
/// 4. `BRU_`-prefixed environment variables,
/// 5. command-line [`Overrides`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Prefix of the index and config documents in the cache root.
    pub namespace: String,
    /// Cache root, relative to the working root unless absolute.
    pub cache_dir: PathBuf,
}
impl Default for Settings {
    fn default() -> Self {
        Self { namespace: "bru".to_string(), cache_dir: PathBuf::from(".cache") }
    }
}

/// Values given on the command line. Unset fields leave lower-priority
/// sources alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Settings {
    pub fn figment(working_root: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(working_root.join("bru.yml")))
            .merge(Toml::file(working_root.join("bru.toml")))
            .merge(Env::raw().only(&[NAMESPACE_ENV]).map(|_| "namespace".into()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load(working_root: &Path, overrides: &Overrides) -> Result<Self> {
        let settings: Self = Self::figment(working_root)
            .merge(Serialized::defaults(overrides))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        tracing::debug!(namespace = %settings.namespace, cache_dir = %settings.cache_dir.display(), "Loaded settings");
        Ok(settings)
    }

    /// Absolute cache root for a working root.
    pub fn cache_root(&self, working_root: &Path) -> PathBuf {
        working_root.join(&self.cache_dir)
    }
}
