//! Supplemental synonym dictionary
//!
//! Maps an entity id to alternate ids that should be treated as the same
//! entity wherever KB tuples or mention ids are resolved.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use dsre_core::{read_to_string, DsreError, Result};

/// id -> set of alternate ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymDictionary {
    entries: HashMap<String, BTreeSet<String>>,
}

impl SynonymDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alternate` as a synonym of `id`
    pub fn insert(&mut self, id: impl Into<String>, alternate: impl Into<String>) {
        self.entries
            .entry(id.into())
            .or_default()
            .insert(alternate.into());
    }

    /// Load a tab-delimited `id<TAB>alt[|alt...]` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path)?;
        let mut dictionary = Self::new();

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut columns = line.split('\t');
            let id = columns.next().unwrap_or_default().trim();
            let alternates = columns.next().ok_or_else(|| DsreError::MalformedRecord {
                path: path.to_path_buf(),
                line: line_no + 1,
                message: "expected id and alternate columns".to_string(),
            })?;
            for alternate in alternates.split('|').map(str::trim).filter(|a| !a.is_empty()) {
                dictionary.insert(id, alternate);
            }
        }

        tracing::debug!(
            "Loaded {} synonym entries from {}",
            dictionary.len(),
            path.display()
        );
        Ok(dictionary)
    }

    /// Alternates registered for an id
    pub fn get(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(id)
    }

    /// The id together with all of its alternates
    pub fn expand(&self, id: &str) -> BTreeSet<String> {
        let mut ids = BTreeSet::from([id.to_string()]);
        if let Some(alternates) = self.entries.get(id) {
            ids.extend(alternates.iter().cloned());
        }
        ids
    }

    /// Expand every id of a set
    pub fn expand_all(&self, ids: &BTreeSet<String>) -> BTreeSet<String> {
        ids.iter().flat_map(|id| self.expand(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_expand_includes_self() {
        let mut dict = SynonymDictionary::new();
        dict.insert("P1", "P1a");
        assert_eq!(dict.expand("P1").len(), 2);
        assert_eq!(dict.expand("P9"), BTreeSet::from(["P9".to_string()]));
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1017\t1018|1019").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "1017\t1020").unwrap();
        let dict = SynonymDictionary::load(file.path()).unwrap();
        assert_eq!(dict.get("1017").unwrap().len(), 3);
    }

    #[test]
    fn test_load_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "only-one-column").unwrap();
        let err = SynonymDictionary::load(file.path()).unwrap_err();
        assert!(matches!(err, DsreError::MalformedRecord { line: 1, .. }));
    }
}
