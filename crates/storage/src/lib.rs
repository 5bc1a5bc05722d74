//! Storage backends for the bru cache and workspace.
//!
//! Everything that touches a filesystem goes through a [`StorageBackend`]:
//! the cache root, the working tree that generators read sources from, and
//! the output tree that cached documents get published into. Tests swap in
//! the in-memory `MockBackend` (behind the `mock` feature).

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
