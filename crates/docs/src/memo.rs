use crate::error::Result;
use bru_cache::{Cache, CacheKey, Cached};
use std::future::Future;

/// Where the content handed back by [`memoize`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Memoized {
    Cached(String),
    Generated(String),
}
impl Memoized {
    pub fn content(&self) -> &str {
        match self {
            Self::Cached(content) | Self::Generated(content) => content,
        }
    }

    pub fn was_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Returns the cached variant of `key`, or runs `generate` and caches its
/// output.
///
/// Failing to cache the fresh output is logged; the output is still returned
/// and the next run simply generates it again.
pub async fn memoize<F, Fut>(cache: &Cache, key: &CacheKey, extension: &str, generate: F) -> Result<Memoized>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    if let Cached::Hit(content) = cache.check_and_read(key, extension).await {
        tracing::debug!(key = %key, extension, "Using cached content");
        return Ok(Memoized::Cached(content));
    }
    let content = generate().await?;
    if let Err(err) = cache.write_through(key, &content, extension).await {
        tracing::warn!(key = %key, extension, error = ?err, "Could not cache generated content");
    }
    Ok(Memoized::Generated(content))
}
