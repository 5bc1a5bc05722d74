//! Keeping storage paths inside their backend's root.
//!
//! Cache keys are relative source paths used verbatim as path fragments under
//! the cache root, so every path is normalized here before a backend sees it.

use crate::error::{ErrorKind, Result};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Normalizes a backend-relative path.
///
/// Empty and `.` segments vanish, a leading `/` means the backend root, and
/// `..` pops a segment. Climbing above the root, null bytes, Windows prefixes
/// and paths with no segments left fail with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// ```
/// use std::path::Path;
/// use bru_storage::validate_path;
///
/// assert_eq!(validate_path("./modules//ask/./mod.ts/").unwrap(), Path::new("modules/ask/mod.ts"));
/// assert_eq!(validate_path("modules/../helpers/log.ts").unwrap(), Path::new("helpers/log.ts"));
/// assert!(validate_path("../etc/passwd").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());

    let mut segments: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            // Null bytes survive `components()` on Unix and truncate paths in
            // syscalls.
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(segment) => segments.push(segment),
            Component::ParentDir => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
        }
    }
    if segments.is_empty() {
        exn::bail!(invalid());
    }
    Ok(segments.into_iter().collect())
}
