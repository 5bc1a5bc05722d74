//! In-memory form of the hash-table index document.
//!
//! ```yaml
//! modules:
//!   ask:
//!     - mod.ts
//! docs:
//!   '':
//!     - intro.md
//! ```

use crate::key::Bucket;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

type Subdirectories = BTreeMap<String, Vec<String>>;

/// `category -> subdirectory -> filenames`.
///
/// Categories and subdirectories are kept sorted so that persisting the same
/// content always produces the same document. Filenames keep insertion order
/// and never repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashTable(BTreeMap<String, Subdirectories>);

impl HashTable {
    /// Parses an index document. Empty documents (or a bare `null`) are an
    /// empty table.
    pub fn parse(document: &str) -> Result<Self, serde_yaml::Error> {
        let parsed: Option<Self> = serde_yaml::from_str(document)?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, bucket: &Bucket) -> bool {
        self.0
            .get(&bucket.category)
            .and_then(|subdirectories| subdirectories.get(&bucket.subdirectory))
            .is_some_and(|files| files.contains(&bucket.filename))
    }

    /// Files the bucket's filename, creating missing levels. Returns `false`
    /// if it was already present.
    pub fn insert(&mut self, bucket: &Bucket) -> bool {
        let files = self
            .0
            .entry(bucket.category.clone())
            .or_default()
            .entry(bucket.subdirectory.clone())
            .or_default();
        if files.contains(&bucket.filename) {
            return false;
        }
        files.push(bucket.filename.clone());
        true
    }

    /// Drops the bucket's filename, pruning a subdirectory left empty and
    /// then a category left empty. Returns `false` if nothing was removed.
    pub fn remove(&mut self, bucket: &Bucket) -> bool {
        let Some(subdirectories) = self.0.get_mut(&bucket.category) else {
            return false;
        };
        let Some(files) = subdirectories.get_mut(&bucket.subdirectory) else {
            return false;
        };
        let Some(position) = files.iter().position(|f| f == &bucket.filename) else {
            return false;
        };
        files.remove(position);
        if files.is_empty() {
            subdirectories.remove(&bucket.subdirectory);
        }
        if subdirectories.is_empty() {
            self.0.remove(&bucket.category);
        }
        true
    }

    pub fn category(&self, category: &str) -> Option<&Subdirectories> {
        self.0.get(category)
    }

    /// Every filed entry, in category then subdirectory order.
    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.0.iter().flat_map(|(category, subdirectories)| {
            subdirectories.iter().flat_map(move |(subdirectory, files)| {
                files.iter().map(move |filename| Bucket {
                    category: category.clone(),
                    subdirectory: subdirectory.clone(),
                    filename: filename.clone(),
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("\n")]
    #[case("null")]
    #[case("{}")]
    fn test_parse_empty(#[case] document: &str) {
        assert!(HashTable::parse(document).unwrap().is_empty());
    }

    #[test]
    fn test_parse_document() {
        let table = HashTable::parse("modules:\n  ask:\n    - mod.ts\n    - perm.ts\ndocs:\n  '':\n    - intro.md\n").unwrap();
        assert!(table.contains(&Bucket::derive("modules/ask/mod.ts")));
        assert!(table.contains(&Bucket::derive("modules/ask/perm.ts")));
        assert!(table.contains(&Bucket::derive("docs/intro.md")));
        assert!(!table.contains(&Bucket::derive("modules/ask/other.ts")));
    }

    #[rstest]
    #[case("modules: [1, 2")]
    #[case("- just\n- a list\n")]
    #[case("modules: 7")]
    fn test_parse_malformed(#[case] document: &str) {
        assert!(HashTable::parse(document).is_err());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut table = HashTable::default();
        let bucket = Bucket::derive("modules/ask/mod.ts");
        assert!(table.insert(&bucket));
        assert!(!table.insert(&bucket));
        assert_eq!(table.category("modules").unwrap()["ask"], vec!["mod.ts".to_string()]);
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut table = HashTable::default();
        table.insert(&Bucket::derive("modules/ask/zeta.ts"));
        table.insert(&Bucket::derive("modules/ask/alpha.ts"));
        assert_eq!(table.category("modules").unwrap()["ask"], vec!["zeta.ts".to_string(), "alpha.ts".to_string()]);
    }

    #[test]
    fn test_remove_prunes_empty_levels() {
        let mut table = HashTable::default();
        table.insert(&Bucket::derive("modules/ask/mod.ts"));
        table.insert(&Bucket::derive("modules/ask/perm.ts"));
        table.insert(&Bucket::derive("modules/draft/mod.ts"));

        assert!(table.remove(&Bucket::derive("modules/ask/mod.ts")));
        assert!(table.contains(&Bucket::derive("modules/ask/perm.ts")));

        assert!(table.remove(&Bucket::derive("modules/ask/perm.ts")));
        assert!(!table.category("modules").unwrap().contains_key("ask"));

        assert!(table.remove(&Bucket::derive("modules/draft/mod.ts")));
        assert!(table.category("modules").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_missing() {
        let mut table = HashTable::default();
        table.insert(&Bucket::derive("modules/ask/mod.ts"));
        assert!(!table.remove(&Bucket::derive("modules/ask/other.ts")));
        assert!(!table.remove(&Bucket::derive("helpers/log.ts")));
        assert!(!table.remove(&Bucket::derive("modules/nope/mod.ts")));
        assert!(table.contains(&Bucket::derive("modules/ask/mod.ts")));
    }

    #[test]
    fn test_yaml_shape() {
        let mut table = HashTable::default();
        table.insert(&Bucket::derive("docs/intro.md"));
        let yaml = table.to_yaml().unwrap();
        assert!(yaml.starts_with("docs:\n"));
        assert!(yaml.contains("- intro.md"));
        assert_eq!(HashTable::parse(&yaml).unwrap(), table);
    }

    #[test]
    fn test_buckets() {
        let mut table = HashTable::default();
        table.insert(&Bucket::derive("top.ts"));
        table.insert(&Bucket::derive("modules/ask/mod.ts"));
        let keys: Vec<String> = table.buckets().map(|b| b.key()).collect();
        assert_eq!(keys, vec!["modules/ask/mod.ts".to_string(), "top.ts".to_string()]);
    }
}
