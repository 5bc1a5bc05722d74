//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Storage failures are raised underneath these kinds with
//! `or_raise`, so the underlying I/O error stays visible in reports.
//!
//! Only some of these ever reach callers of the [`Cache`](crate::Cache):
//! index load and persist failures are logged and swallowed by the public
//! index API, and a cache miss is usually reported as
//! [`Cached::Miss`](crate::Cached::Miss) instead.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The key is not a usable relative path.
    #[display("invalid cache key: {_0:?}")]
    InvalidKey(#[error(not(source))] String),
    /// Blob absent or unreadable. Regenerate.
    #[display("cache miss: {_0}")]
    CacheMiss(#[error(not(source))] String),
    /// Writing a blob failed.
    #[display("could not write cache entry: {_0}")]
    Write(#[error(not(source))] String),
    /// Deleting a blob failed for a reason other than it already being gone.
    #[display("could not remove cache entry: {_0}")]
    RemovalFailed(#[error(not(source))] String),
    /// The index file could not be read or parsed.
    #[display("could not load cache index")]
    IndexLoad,
    /// The index file could not be written.
    #[display("could not persist cache index")]
    IndexPersist,
    /// Reading from or writing to a storage backend failed.
    #[display("storage error")]
    Storage,
    /// An extension mapping was not of the form `.from=.to`.
    #[display("invalid extension mapping: {_0:?}")]
    InvalidExtensionMap(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_) | Self::RemovalFailed(_) | Self::IndexPersist | Self::Storage)
    }

    /// Returns `true` if the caller should regenerate rather than fail.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::CacheMiss(_))
    }
}
