//! DSRE Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the DSRE system:
//! - Relation schema (label-vector column order)
//! - Sentence, token and dependency structures
//! - Label values and label vectors
//! - Common error types
//! - Configuration management

pub mod config;
pub mod labels;
pub mod schema;
pub mod sentence;

pub use config::{
    AppConfig, ConfigError, CrossValidationConfig, EncodingKind, KbConfig, LabelingConfig,
    LoggingConfig, VocabularyConfig,
};
pub use labels::{Label, LabelVector};
pub use schema::{RelationKind, RelationSchema, SYMMETRIC_TAG};
pub use sentence::{Dependency, DependencyPath, EntityPair, MentionSpan, PathEdge, Sentence, Token};

use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for DSRE operations
#[derive(Error, Debug)]
pub enum DsreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path} at line {line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Relation not present in knowledge base: {0}")]
    UnknownRelation(String),

    #[error("Duplicate relation in schema: {0}")]
    DuplicateRelation(String),

    #[error("Label vector has length {actual}, relation schema has {expected}")]
    LabelLength { expected: usize, actual: usize },

    #[error("Invalid fold configuration: {0}")]
    InvalidFolds(String),

    #[error("Ontology cycle detected at term {0}")]
    OntologyCycle(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Feature layout error: {0}")]
    FeatureLayout(String),

    #[error("Instance has not been encoded: {0}")]
    MissingFeatures(String),

    #[error("Model trainer error: {0}")]
    Trainer(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DsreError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DsreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DsreError>;

/// Read a whole text file, attaching the path to any I/O failure
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| DsreError::io(path, e))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_carries_path() {
        let err = read_to_string("/definitely/not/here.txt").unwrap_err();
        match err {
            DsreError::Io { path, .. } => assert_eq!(path, PathBuf::from("/definitely/not/here.txt")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = DsreError::LabelLength {
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Label vector has length 2, relation schema has 3"
        );
    }
}
