//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Merging the configuration sources failed (bad file, bad env value).
    #[display("invalid configuration")]
    Load,
    /// A generator config document exists but could not be parsed.
    #[display("invalid generator config: {}", _0.display())]
    Parse(#[error(not(source))] PathBuf),
    /// A generator config document could not be written.
    #[display("could not write generator config: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}
