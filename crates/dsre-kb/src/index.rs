//! Knowledge base index
//!
//! Each relation file becomes a pair of tuple sets. Records whose relation
//! column is in passive voice (ends with "by") describe the tuple read
//! backwards and go to the reverse set.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dsre_core::{read_to_string, DsreError, KbConfig, RelationSchema, Result};

use crate::SynonymDictionary;

/// Passive-voice marker on the relation column
pub const PASSIVE_SUFFIX: &str = "by";

/// (entity A id, entity B id)
pub type EntityTuple = (String, String);

/// Column positions inside a relation file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbColumns {
    pub entity_a: usize,
    pub entity_b: usize,
    pub relation: usize,
}

impl From<&KbConfig> for KbColumns {
    fn from(config: &KbConfig) -> Self {
        Self {
            entity_a: config.entity_a_column,
            entity_b: config.entity_b_column,
            relation: config.relation_column,
        }
    }
}

/// Forward and reverse tuples of one relation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTuples {
    pub forward: HashSet<EntityTuple>,
    pub reverse: HashSet<EntityTuple>,
}

impl RelationTuples {
    /// True if any candidate tuple is in the forward set
    pub fn intersects_forward(&self, combos: &BTreeSet<EntityTuple>) -> bool {
        combos.iter().any(|c| self.forward.contains(c))
    }

    /// True if any candidate tuple is in the reverse set
    pub fn intersects_reverse(&self, combos: &BTreeSet<EntityTuple>) -> bool {
        combos.iter().any(|c| self.reverse.contains(c))
    }

    /// Total tuples across both directions
    pub fn len(&self) -> usize {
        self.forward.len() + self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }
}

/// Load one relation file into forward/reverse tuple sets
pub fn load_distant_kb(
    path: impl AsRef<Path>,
    columns: KbColumns,
    synonyms: &SynonymDictionary,
) -> Result<RelationTuples> {
    let path = path.as_ref();
    let content = read_to_string(path)?;
    let mut tuples = RelationTuples::default();

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let column = |index: usize| {
            fields
                .get(index)
                .copied()
                .ok_or_else(|| DsreError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("missing column {index} ({} columns)", fields.len()),
                })
        };

        let entity_a = synonyms.expand(column(columns.entity_a)?);
        let entity_b = synonyms.expand(column(columns.entity_b)?);
        let target = if column(columns.relation)?.ends_with(PASSIVE_SUFFIX) {
            &mut tuples.reverse
        } else {
            &mut tuples.forward
        };

        for a in &entity_a {
            for b in &entity_b {
                target.insert((a.clone(), b.clone()));
            }
        }
    }

    Ok(tuples)
}

/// Relation name -> tuples
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBaseIndex {
    relations: BTreeMap<String, RelationTuples>,
}

impl KnowledgeBaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a relation
    pub fn insert(&mut self, name: impl Into<String>, tuples: RelationTuples) {
        self.relations.insert(name.into(), tuples);
    }

    pub fn get(&self, name: &str) -> Option<&RelationTuples> {
        self.relations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Relation names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Ensure every schema relation has an entry
    pub fn validate(&self, schema: &RelationSchema) -> Result<()> {
        match schema.names().iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(DsreError::UnknownRelation(missing.clone())),
            None => Ok(()),
        }
    }

    /// A schema listing every indexed relation, in sorted order
    pub fn schema(&self) -> Result<RelationSchema> {
        RelationSchema::new(self.relations.keys().cloned())
    }

    /// Load a directional and a symmetric folder of relation files
    pub fn load_directories(
        directional_dir: impl AsRef<Path>,
        symmetric_dir: impl AsRef<Path>,
        columns: KbColumns,
        synonyms: &SynonymDictionary,
    ) -> Result<Self> {
        let mut index = Self::new();

        for (path, stem) in relation_files(directional_dir.as_ref())? {
            index.insert(stem, load_distant_kb(&path, columns, synonyms)?);
        }
        for (path, stem) in relation_files(symmetric_dir.as_ref())? {
            index.insert(
                RelationSchema::symmetric_name(&stem),
                load_distant_kb(&path, columns, synonyms)?,
            );
        }

        tracing::info!(
            "Indexed {} relations ({} tuples)",
            index.len(),
            index.relations.values().map(RelationTuples::len).sum::<usize>()
        );
        Ok(index)
    }
}

/// Free-function form of [`KnowledgeBaseIndex::load_directories`]
pub fn load_distant_directories(
    directional_dir: impl AsRef<Path>,
    symmetric_dir: impl AsRef<Path>,
    columns: KbColumns,
    synonyms: &SynonymDictionary,
) -> Result<KnowledgeBaseIndex> {
    KnowledgeBaseIndex::load_directories(directional_dir, symmetric_dir, columns, synonyms)
}

/// `*.txt` files of a directory with their stems, sorted by path
fn relation_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| DsreError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DsreError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let stem = stem.to_string();
            files.push((path, stem));
        }
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================
