//! Content-addressed documentation cache.
//!
//! Generators memoize expensive output (summaries, MDX pages) under the
//! relative path of the source file it was generated from. Two pieces of
//! state live under the cache root:
//! - **Blobs**: one text file per `(key, variant extension)`, mirroring the
//!   key's directory structure (`modules/ask/mod.ts` + `.md` is stored at
//!   `modules/ask/mod.md`).
//! - **Index**: `<namespace>_hashtable.yml`, a `category -> subdirectory ->
//!   filenames` document that is the single source of truth for whether a key
//!   is cached. A blob the index doesn't know about is a miss.
//!
//! [`Cache`] keeps the two in step; [`copy_selected`] publishes cached blobs
//! into an output tree.

mod copy;
pub mod error;
mod facade;
mod index;
mod key;
mod store;
mod table;

pub use crate::copy::{CopyEvent, CopySummary, ExtensionMap, MAX_COPY_CONCURRENCY, copy_selected, normalize_directory};
pub use crate::facade::{Cache, Cached, Invalidated};
pub use crate::index::Index;
pub use crate::key::{Bucket, CacheKey};
pub use crate::store::Store;
pub use crate::table::HashTable;

/// Directory under the working root that holds the cache.
pub const CACHE_DIR: &str = ".cache";
/// Variant extension used when a caller doesn't name one.
pub const DEFAULT_EXTENSION: &str = ".txt";
