//! Relation schema
//!
//! The ordered list of relation names that fixes what every label-vector
//! column means. Built once per run and shared by reference with every
//! component that reads or writes labels.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{DsreError, Result};

/// Tag carried by the names of relations whose truth ignores argument order
pub const SYMMETRIC_TAG: &str = "SYMMETRIC";

/// How a relation treats argument order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Symmetric,
    Directional,
}

impl RelationKind {
    /// Classify a relation by its name
    pub fn of(name: &str) -> Self {
        if name.contains(SYMMETRIC_TAG) {
            Self::Symmetric
        } else {
            Self::Directional
        }
    }
}

/// Ordered, immutable list of relation names (`key_order`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RelationSchema {
    names: Vec<String>,
}

impl RelationSchema {
    /// Create a schema; names must be unique
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(DsreError::DuplicateRelation(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Name used for a relation file found in the symmetric directory
    pub fn symmetric_name(stem: &str) -> String {
        format!("{SYMMETRIC_TAG}{stem}")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Relation names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name at a column
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Column of a relation name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Kind of the relation at a column
    pub fn kind(&self, index: usize) -> Option<RelationKind> {
        self.name(index).map(RelationKind::of)
    }

    /// Iterate `(column, name, kind)` in column order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str, RelationKind)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.as_str(), RelationKind::of(n)))
    }
}

impl TryFrom<Vec<String>> for RelationSchema {
    type Error = DsreError;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Self::new(names)
    }
}

impl From<RelationSchema> for Vec<String> {
    fn from(schema: RelationSchema) -> Self {
        schema.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_order_and_kind() {
        let schema = RelationSchema::new(["SYMMETRIC_bind", "phosphorylates"]).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.position("phosphorylates"), Some(1));
        assert_eq!(schema.kind(0), Some(RelationKind::Symmetric));
        assert_eq!(schema.kind(1), Some(RelationKind::Directional));
        assert_eq!(schema.kind(2), None);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = RelationSchema::new(["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, DsreError::DuplicateRelation(name) if name == "a"));
    }

    #[test]
    fn test_symmetric_name() {
        let name = RelationSchema::symmetric_name("bind");
        assert_eq!(name, "SYMMETRICbind");
        assert_eq!(RelationKind::of(&name), RelationKind::Symmetric);
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let schema = RelationSchema::new(["x", "SYMMETRICy"]).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"["x","SYMMETRICy"]"#);
        let back: RelationSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert!(serde_json::from_str::<RelationSchema>(r#"["x","x"]"#).is_err());
    }
}
