//! Documentation Generator Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A generator error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for documentation generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The generator command could not be found on `PATH`.
    #[display("generator command not found: {_0}")]
    GeneratorNotFound(#[error(not(source))] String),
    /// The generator command ran but did not produce usable output.
    #[display("generator failed: {_0}")]
    Generator(#[error(not(source))] String),
    /// No directories were given and none were remembered from a previous run.
    #[display("no directories selected")]
    NoDirectories,
    /// A file-name pattern did not compile.
    #[display("invalid file pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// Listing or reading source files failed.
    #[display("could not read source files")]
    Source,
    #[display("cache error")]
    Cache,
    #[display("configuration error")]
    Config,
    /// Writing generated output failed.
    #[display("could not write output: {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generator(_) | Self::Output(_))
    }
}
