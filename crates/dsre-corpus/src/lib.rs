//! DSRE Corpus - Annotated sentence loading
//!
//! Reads pre-parsed sentences (tokens, NER, normalization, dependencies)
//! and attaches entity-pair candidates for the requested entity types.
//!
//! Each loader implements the `CorpusLoader` trait and produces a
//! `Corpus` holding shared sentences plus the set of document ids they
//! come from.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use dsre_core::{DsreError, Result, Sentence};

pub mod jsonl;

pub use jsonl::JsonLinesLoader;

// ============================================================================
// Corpus
// ============================================================================

/// Candidate sentences and the documents covering them
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub sentences: Vec<Arc<Sentence>>,
    pub document_ids: BTreeSet<String>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sentence, registering its document
    pub fn push(&mut self, sentence: Sentence) {
        self.document_ids.insert(sentence.document_id.clone());
        self.sentences.push(Arc::new(sentence));
    }

    /// Append another corpus
    pub fn extend(&mut self, other: Corpus) {
        self.sentences.extend(other.sentences);
        self.document_ids.extend(other.document_ids);
    }

    /// Document ids in sorted order
    pub fn document_list(&self) -> Vec<String> {
        self.document_ids.iter().cloned().collect()
    }

    /// Total entity-pair candidates
    pub fn candidate_count(&self) -> usize {
        self.sentences.iter().map(|s| s.entity_pairs.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

// ============================================================================
// Loader Trait
// ============================================================================

/// Trait for annotated-corpus readers
pub trait CorpusLoader: Send + Sync {
    /// Load one source, keeping sentences with at least one
    /// (entity_a, entity_b) candidate
    fn load(&self, path: &Path, entity_a: &str, entity_b: &str) -> Result<Corpus>;

    /// Whether this loader reads the given file
    fn can_load(&self, path: &Path) -> bool;

    /// Get loader name for logging
    fn name(&self) -> &str;
}

/// Load every file under a directory (recursively) that the loader accepts
pub fn load_corpus_directory(
    loader: &dyn CorpusLoader,
    directory: impl AsRef<Path>,
    entity_a: &str,
    entity_b: &str,
) -> Result<Corpus> {
    let directory = directory.as_ref();
    let files = collect_files(directory)?;

    let mut corpus = Corpus::new();
    for file in files.iter().filter(|f| loader.can_load(f)) {
        tracing::debug!("Loading {} with {}", file.display(), loader.name());
        corpus.extend(loader.load(file, entity_a, entity_b)?);
    }

    tracing::info!(
        "Loaded {} sentences ({} candidates) from {} documents under {}",
        corpus.len(),
        corpus.candidate_count(),
        corpus.document_ids.len(),
        directory.display()
    );
    Ok(corpus)
}

/// Regular files under `dir` in file-name order. Symlinks are not followed.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            DsreError::io(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

// ============================================================================
// Mention Inventory
// ============================================================================

/// Count `normalized|lemma_phrase` keys for mentions of two entity types.
/// When both types are equal every mention is counted in both maps.
pub fn mention_inventory(
    corpus: &Corpus,
    entity_a: &str,
    entity_b: &str,
) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
    let mut a_counts = BTreeMap::new();
    let mut b_counts = BTreeMap::new();

    for sentence in &corpus.sentences {
        for (tag, span) in sentence.mentions() {
            if tag != entity_a && tag != entity_b {
                continue;
            }
            let phrase: Vec<&str> = span
                .token_ids()
                .filter_map(|id| sentence.token(id))
                .map(|t| t.lemma.as_str())
                .collect();
            let normalized = sentence
                .token(span.head())
                .and_then(|t| t.normalized_ner.clone())
                .unwrap_or_default();
            let key = format!("{}|{}", normalized, phrase.join("_"));
            if tag == entity_a {
                *a_counts.entry(key.clone()).or_insert(0) += 1;
            }
            if tag == entity_b {
                *b_counts.entry(key).or_insert(0) += 1;
            }
        }
    }

    (a_counts, b_counts)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dsre_core::Token;

    fn sentence(doc: &str) -> Sentence {
        let mut s = Sentence::new(doc, "0");
        s.add_token(Token::new(1, "p53", "p53", "NN", "GENE").with_normalized_ner("7157"));
        s.add_token(Token::new(2, "binds", "bind", "VBZ", "O"));
        s.add_token(Token::new(3, "MDM2", "MDM2", "NN", "GENE").with_normalized_ner("4193"));
        s
    }

    #[test]
    fn test_corpus_tracks_documents() {
        let mut corpus = Corpus::new();
        corpus.push(sentence("d2"));
        corpus.push(sentence("d1"));
        corpus.push(sentence("d2"));
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.document_list(), vec!["d1", "d2"]);
    }

    #[test]
    fn test_mention_inventory() {
        let mut corpus = Corpus::new();
        corpus.push(sentence("d1"));
        corpus.push(sentence("d2"));
        let (genes, others) = mention_inventory(&corpus, "GENE", "CHEMICAL");
        assert_eq!(genes.get("7157|p53"), Some(&2));
        assert_eq!(genes.get("4193|MDM2"), Some(&2));
        assert!(others.is_empty());
    }

    #[test]
    fn test_mention_inventory_same_type_fills_both() {
        let mut corpus = Corpus::new();
        corpus.push(sentence("d1"));
        let (a, b) = mention_inventory(&corpus, "GENE", "GENE");
        assert_eq!(a, b);
        assert_eq!(a.get("7157|p53"), Some(&1));
    }
}
