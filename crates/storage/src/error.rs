//! Storage Error Types
//!
//! Callers further up (the cache, the generators) raise their own kinds on
//! top of these with `or_raise`, so the storage cause stays in the tree.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Relative path escapes the root, or a root that isn't usable.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// A walk turned up a path that isn't under the backend root.
    #[display("outside storage root: {}", _0.display())]
    OutsideRoot(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::NotFound(PathBuf::from("a/b.md")), "file not found: a/b.md", false)]
    #[case(ErrorKind::InvalidPath(PathBuf::from("../x")), "invalid path: ../x", false)]
    #[case(ErrorKind::PermissionDenied(PathBuf::from("x")), "permission denied: x", false)]
    #[case(ErrorKind::Io(IoError::other("boom")), "I/O error: boom", true)]
    fn test_kind(#[case] kind: ErrorKind, #[case] display: &str, #[case] retryable: bool) {
        assert_eq!(kind.to_string(), display);
        assert_eq!(kind.is_retryable(), retryable);
    }
}
