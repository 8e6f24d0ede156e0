//! Frequency-pruned vocabularies
//!
//! A vocabulary maps terms to dense indices, most frequent term first.
//! Equal frequencies are ordered lexicographically so that the same corpus
//! always yields the same indices. Vocabularies are built once and never
//! mutated afterwards; encoding unseen text drops (flat) or maps to
//! `UNKNOWN_WORD` (sequence) without touching the vocabulary.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dsre_core::{read_to_string, DsreError, EncodingKind, Result};

use crate::instance::PathTokens;

/// Sentinel for out-of-vocabulary tokens in sequence encodings
pub const UNKNOWN_WORD: &str = "UNKNOWN_WORD";

/// Sentinel filling unused sequence slots
pub const PADDING_WORD: &str = "PADDING_WORD";

/// Default minimum occurrence for pruned vocabularies
pub const DEFAULT_MIN_OCCURRENCE: usize = 100;

// ============================================================================
// Vocabulary
// ============================================================================

/// Immutable term -> index mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VocabularyRecord", into = "VocabularyRecord")]
pub struct Vocabulary {
    terms: Vec<String>,
    counts: Vec<usize>,
    index: HashMap<String, usize>,
    discarded: usize,
}

#[derive(Serialize, Deserialize)]
struct VocabularyRecord {
    terms: Vec<String>,
    counts: Vec<usize>,
    discarded: usize,
}

impl From<VocabularyRecord> for Vocabulary {
    fn from(record: VocabularyRecord) -> Self {
        let mut vocabulary = Self::empty();
        let mut counts = record.counts.into_iter();
        for term in record.terms {
            vocabulary.push_term(term, counts.next().unwrap_or(0));
        }
        vocabulary.discarded = record.discarded;
        vocabulary
    }
}

impl From<Vocabulary> for VocabularyRecord {
    fn from(vocabulary: Vocabulary) -> Self {
        Self {
            terms: vocabulary.terms,
            counts: vocabulary.counts,
            discarded: vocabulary.discarded,
        }
    }
}

impl Vocabulary {
    fn empty() -> Self {
        Self {
            terms: Vec::new(),
            counts: Vec::new(),
            index: HashMap::new(),
            discarded: 0,
        }
    }

    fn push_term(&mut self, term: impl Into<String>, count: usize) {
        let term = term.into();
        self.index.insert(term.clone(), self.terms.len());
        self.terms.push(term);
        self.counts.push(count);
    }

    /// Count words and keep those seen at least `min_occurrence` times.
    ///
    /// Kept terms are indexed by descending frequency, ties in lexicographic
    /// order. Without a cutoff every distinct word is kept.
    pub fn build<I, S>(words: I, min_occurrence: Option<usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for word in words {
            let word = word.as_ref();
            match frequencies.get_mut(word) {
                Some(count) => *count += 1,
                None => {
                    frequencies.insert(word.to_string(), 1);
                }
            }
        }

        let distinct = frequencies.len();
        let discarded = min_occurrence
            .map(|cutoff| frequencies.values().filter(|&&c| c < cutoff).count())
            .unwrap_or(0);

        let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(distinct - discarded);

        let mut vocabulary = Self::empty();
        for (term, count) in ranked {
            vocabulary.push_term(term, count);
        }
        vocabulary.discarded = discarded;
        vocabulary
    }

    /// Index terms in the given order (e.g. a pretrained embedding's rows).
    ///
    /// Repeated terms keep their first index.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self::empty();
        for term in terms {
            let term = term.into();
            if !vocabulary.index.contains_key(&term) {
                vocabulary.push_term(term, 0);
            }
        }
        vocabulary
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Index of a term
    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Term at an index
    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    /// Corpus frequency of the term at an index (0 for injected terms)
    pub fn count(&self, index: usize) -> Option<usize> {
        self.counts.get(index).copied()
    }

    /// Number of distinct terms pruned by the cutoff
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Terms in index order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Indices of the in-vocabulary terms, in input order
    pub fn lookup<'v, S: AsRef<str>>(&'v self, terms: &'v [S]) -> impl Iterator<Item = usize> + 'v {
        terms.iter().filter_map(|t| self.get(t.as_ref()))
    }
}

/// Build a vocabulary from a word list (see [`Vocabulary::build`])
pub fn build_dataset<I, S>(words: I, min_occurrence: Option<usize>) -> Vocabulary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Vocabulary::build(words, min_occurrence)
}

/// Read the word column of a word2vec text-format embedding file
pub fn load_embedding_vocabulary(path: impl AsRef<Path>) -> Result<Vocabulary> {
    let content = read_to_string(path)?;
    let mut lines = content.lines().peekable();

    // "<rows> <dimensions>" header
    if let Some(first) = lines.peek() {
        let fields: Vec<&str> = first.split_whitespace().collect();
        if fields.len() == 2 && fields.iter().all(|f| f.parse::<usize>().is_ok()) {
            lines.next();
        }
    }

    Ok(Vocabulary::from_terms(
        lines.filter_map(|line| line.split_whitespace().next()),
    ))
}

// ============================================================================
// Sentinel Vocabulary
// ============================================================================

/// Vocabulary with `UNKNOWN_WORD` and `PADDING_WORD` appended at
/// indices `size` and `size + 1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SentinelRecord")]
pub struct SentinelVocabulary {
    vocabulary: Vocabulary,
    unknown: usize,
    padding: usize,
}

#[derive(Deserialize)]
struct SentinelRecord {
    vocabulary: Vocabulary,
    unknown: usize,
    padding: usize,
}

impl TryFrom<SentinelRecord> for SentinelVocabulary {
    type Error = DsreError;

    fn try_from(record: SentinelRecord) -> Result<Self> {
        let SentinelRecord {
            vocabulary,
            unknown,
            padding,
        } = record;
        let valid = padding == unknown + 1
            && padding + 1 == vocabulary.len()
            && vocabulary.term(unknown) == Some(UNKNOWN_WORD)
            && vocabulary.term(padding) == Some(PADDING_WORD);
        if !valid {
            return Err(DsreError::FeatureLayout(format!(
                "sentinels at {unknown}/{padding} do not close a vocabulary of {} terms",
                vocabulary.len()
            )));
        }
        Ok(Self {
            vocabulary,
            unknown,
            padding,
        })
    }
}

impl SentinelVocabulary {
    pub fn new(base: Vocabulary) -> Self {
        let mut vocabulary = base;
        let unknown = vocabulary.len();
        vocabulary.push_term(UNKNOWN_WORD, 0);
        vocabulary.push_term(PADDING_WORD, 0);
        Self {
            vocabulary,
            unknown,
            padding: unknown + 1,
        }
    }

    /// Index of a term, or the unknown id
    pub fn id_or_unknown(&self, term: &str) -> usize {
        self.vocabulary.get(term).unwrap_or(self.unknown)
    }

    pub fn unknown_id(&self) -> usize {
        self.unknown
    }

    pub fn padding_id(&self) -> usize {
        self.padding
    }

    /// Size including both sentinels
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

// ============================================================================
// Corpora and Vocabulary Sets
// ============================================================================

/// Raw token streams accumulated while labeling
#[derive(Debug, Clone, Default)]
pub struct VocabularyCorpora {
    pub dependency_paths: Vec<String>,
    pub dependency_words: Vec<String>,
    pub dependency_elements: Vec<String>,
    pub between_words: Vec<String>,
    pub dependency_types: Vec<String>,
}

impl VocabularyCorpora {
    /// Append one instance's token lists
    pub fn absorb(&mut self, tokens: &PathTokens) {
        self.dependency_paths.push(tokens.dependency_path.clone());
        self.dependency_words
            .extend(tokens.dependency_words.iter().cloned());
        self.dependency_elements
            .extend(tokens.dependency_elements.iter().cloned());
        self.between_words.extend(tokens.between_words.iter().cloned());
        self.dependency_types
            .extend(tokens.dependency_types.iter().cloned());
    }

    pub fn extend(&mut self, other: VocabularyCorpora) {
        self.dependency_paths.extend(other.dependency_paths);
        self.dependency_words.extend(other.dependency_words);
        self.dependency_elements.extend(other.dependency_elements);
        self.between_words.extend(other.between_words);
        self.dependency_types.extend(other.dependency_types);
    }

    pub fn is_empty(&self) -> bool {
        self.dependency_paths.is_empty()
    }
}

/// The four vocabularies behind the flat encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularySet {
    pub dependency_paths: Vocabulary,
    pub dependency_words: Vocabulary,
    pub dependency_elements: Vocabulary,
    pub between_words: Vocabulary,
}

/// Path-type and path-word vocabularies behind the sequence encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceVocabularies {
    pub types: SentinelVocabulary,
    pub words: SentinelVocabulary,
}

/// Vocabularies for either encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum Vocabularies {
    Flat(VocabularySet),
    Sequence(SequenceVocabularies),
}

impl Vocabularies {
    pub fn kind(&self) -> EncodingKind {
        match self {
            Self::Flat(_) => EncodingKind::Flat,
            Self::Sequence(_) => EncodingKind::Sequence,
        }
    }

    /// (name, size) of each vocabulary, for reporting
    pub fn sizes(&self) -> Vec<(&'static str, usize)> {
        match self {
            Self::Flat(set) => vec![
                ("dependency_paths", set.dependency_paths.len()),
                ("dependency_words", set.dependency_words.len()),
                ("dependency_elements", set.dependency_elements.len()),
                ("between_words", set.between_words.len()),
            ],
            Self::Sequence(seq) => vec![
                ("dependency_types", seq.types.len()),
                ("dependency_words", seq.words.len()),
            ],
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds the vocabularies of one construction pass
#[derive(Debug, Clone)]
pub struct VocabularyBuilder {
    encoding: EncodingKind,
    min_occurrence: Option<usize>,
    pretrained_words: Option<Vocabulary>,
}

impl VocabularyBuilder {
    /// Builder with the default cutoff
    pub fn new(encoding: EncodingKind) -> Self {
        Self {
            encoding,
            min_occurrence: Some(DEFAULT_MIN_OCCURRENCE),
            pretrained_words: None,
        }
    }

    /// Override the cutoff (`None` keeps every term)
    pub fn with_min_occurrence(mut self, min_occurrence: Option<usize>) -> Self {
        self.min_occurrence = min_occurrence;
        self
    }

    /// Use a pretrained embedding's words for the sequence path-word side
    pub fn with_pretrained_words(mut self, words: Vocabulary) -> Self {
        self.pretrained_words = Some(words);
        self
    }

    pub fn encoding(&self) -> EncodingKind {
        self.encoding
    }

    /// Build the four pruned flat vocabularies
    pub fn build_flat(&self, corpora: &VocabularyCorpora) -> VocabularySet {
        VocabularySet {
            dependency_paths: Vocabulary::build(&corpora.dependency_paths, self.min_occurrence),
            dependency_words: Vocabulary::build(&corpora.dependency_words, self.min_occurrence),
            dependency_elements: Vocabulary::build(
                &corpora.dependency_elements,
                self.min_occurrence,
            ),
            between_words: Vocabulary::build(&corpora.between_words, self.min_occurrence),
        }
    }

    /// Build the unpruned type vocabulary and the path-word vocabulary,
    /// both with sentinels appended
    pub fn build_sequence(&self, corpora: &VocabularyCorpora) -> SequenceVocabularies {
        let types = Vocabulary::build(&corpora.dependency_types, Some(0));
        let words = match &self.pretrained_words {
            Some(pretrained) => pretrained.clone(),
            None => Vocabulary::build(&corpora.dependency_words, self.min_occurrence),
        };
        SequenceVocabularies {
            types: SentinelVocabulary::new(types),
            words: SentinelVocabulary::new(words),
        }
    }

    /// Build vocabularies for the configured encoding
    pub fn build(&self, corpora: &VocabularyCorpora) -> Vocabularies {
        let vocabularies = match self.encoding {
            EncodingKind::Flat => Vocabularies::Flat(self.build_flat(corpora)),
            EncodingKind::Sequence => Vocabularies::Sequence(self.build_sequence(corpora)),
        };
        tracing::info!(
            encoding = %self.encoding,
            sizes = ?vocabularies.sizes(),
            "Built vocabularies"
        );
        vocabularies
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn words(counts: &[(&str, usize)]) -> Vec<String> {
        counts.iter()
            .flat_map(|(w, n)| std::iter::repeat(w.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn test_build_orders_by_frequency_then_term() {
        let vocab = build_dataset(words(&[("b", 2), ("c", 5), ("a", 2), ("d", 1)]), None);
        assert_eq!(vocab.terms(), &["c", "a", "b", "d"]);
        assert_eq!(vocab.get("c"), Some(0));
        assert_eq!(vocab.count(1), Some(2));
        assert_eq!(vocab.discarded(), 0);
    }

    #[test]
    fn test_build_prunes_below_cutoff() {
        let vocab = build_dataset(words(&[("x", 3), ("y", 2), ("z", 1)]), Some(2));
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.discarded(), 1);
        assert_eq!(vocab.get("z"), None);
    }

    #[test]
    fn test_zero_cutoff_keeps_everything() {
        let vocab = build_dataset(words(&[("x", 1), ("y", 1)]), Some(0));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_lookup_drops_oov() {
        let vocab = build_dataset(["a", "b"], None);
        let ids: Vec<usize> = vocab.lookup(&["b", "zzz", "a"]).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_sentinels_appended() {
        let vocab = SentinelVocabulary::new(build_dataset(["a", "a", "b"], None));
        assert_eq!(vocab.unknown_id(), 2);
        assert_eq!(vocab.padding_id(), 3);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id_or_unknown("a"), 0);
        assert_eq!(vocab.id_or_unknown("never-seen"), 2);
        assert_eq!(vocab.vocabulary().term(3), Some(PADDING_WORD));
    }

    #[test]
    fn test_from_terms_keeps_first() {
        let vocab = Vocabulary::from_terms(["the", "of", "the"]);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.get("of"), Some(1));
    }

    #[test]
    fn test_load_embedding_vocabulary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3 2").unwrap();
        writeln!(file, "kinase 0.1 0.2").unwrap();
        writeln!(file, "binding 0.3 0.4").unwrap();
        writeln!(file, "protein 0.5 0.6").unwrap();
        let vocab = load_embedding_vocabulary(file.path()).unwrap();
        assert_eq!(vocab.terms(), &["kinase", "binding", "protein"]);
    }

    #[test]
    fn test_serde_restores_index() {
        let vocab = build_dataset(["a", "b", "b"], None);
        let json = serde_json::to_string(&vocab).unwrap();
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vocab);
        assert_eq!(back.get("b"), Some(0));
    }

    #[test]
    fn test_sentinel_serde_checks_sentinels() {
        let sentinel = SentinelVocabulary::new(build_dataset(["a", "b"], None));
        let json = serde_json::to_string(&sentinel).unwrap();
        let back: SentinelVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sentinel);

        let mut value = serde_json::to_value(&sentinel).unwrap();
        value["unknown"] = serde_json::json!(0);
        value["padding"] = serde_json::json!(1);
        assert!(serde_json::from_value::<SentinelVocabulary>(value).is_err());
    }

    #[test]
    fn test_builder_sequence_uses_pretrained() {
        let mut corpora = VocabularyCorpora::default();
        corpora.dependency_types = vec!["nsubj".into(), "dobj".into()];
        corpora.dependency_words = vec!["bind".into()];

        let builder = VocabularyBuilder::new(EncodingKind::Sequence)
            .with_pretrained_words(Vocabulary::from_terms(["bind", "kinase"]));
        let seq = builder.build_sequence(&corpora);
        assert_eq!(seq.types.len(), 4);
        assert_eq!(seq.words.unknown_id(), 2);
        assert_eq!(seq.words.id_or_unknown("kinase"), 1);
    }
}
