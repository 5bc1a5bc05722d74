use std::path::PathBuf;
use time::OffsetDateTime;

/// A file as seen by a listing or a `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Backend-relative.
    pub path: PathBuf,
    pub size: u64,
    pub modified: OffsetDateTime,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Last path segment, when it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("modules/ask/mod.ts", Some("mod.ts"))]
    #[case("top.ts", Some("top.ts"))]
    fn test_file_name(#[case] path: &str, #[case] expected: Option<&str>) {
        let info = FileInfo::new(path, 10, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(info.file_name(), expected);
    }
}
