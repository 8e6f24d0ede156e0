//! Feature encodings
//!
//! Two encodings are supported:
//!
//! - **Flat**: a multi-hot vector over the concatenated
//!   `[path | path words | path elements | between words]` vocabularies.
//! - **Sequence**: fixed-length id sequences of path edge types and path
//!   words, padded to [`SEQUENCE_LENGTH`], followed by their true lengths.
//!
//! Both are produced through the [`FeatureEncoder`] trait so instances can
//! be encoded without knowing which vocabularies are in use.

use serde::{Deserialize, Serialize};

use dsre_core::{DsreError, EncodingKind, Result};

use crate::instance::PathTokens;
use crate::vocabulary::{SequenceVocabularies, Vocabularies, VocabularySet};

/// Maximum encoded length of each sequence
pub const SEQUENCE_LENGTH: usize = 100;

/// Row width of a sequence encoding: two sequences plus two lengths
pub const SEQUENCE_SLOTS: usize = 2 * SEQUENCE_LENGTH + 2;

// ============================================================================
// Encoder Trait
// ============================================================================

/// Trait for turning path tokens into features
pub trait FeatureEncoder: Send + Sync {
    /// Encode one instance's tokens
    fn encode(&self, tokens: &PathTokens) -> Features;

    /// Width of the row produced by [`Features::to_row`]
    fn width(&self) -> usize;

    /// Which encoding this produces
    fn kind(&self) -> EncodingKind;
}

// ============================================================================
// Flat Features
// ============================================================================

/// Sparse multi-hot vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FlatRecord")]
pub struct FlatFeatures {
    dimension: usize,
    /// Sorted, de-duplicated active positions
    active: Vec<usize>,
}

#[derive(Deserialize)]
struct FlatRecord {
    dimension: usize,
    active: Vec<usize>,
}

impl TryFrom<FlatRecord> for FlatFeatures {
    type Error = DsreError;

    fn try_from(record: FlatRecord) -> Result<Self> {
        Self::new(record.dimension, record.active)
    }
}

impl FlatFeatures {
    /// Build from active positions; duplicates collapse to one
    pub fn new(dimension: usize, active: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut active: Vec<usize> = active.into_iter().collect();
        active.sort_unstable();
        active.dedup();
        if let Some(&last) = active.last() {
            if last >= dimension {
                return Err(DsreError::FeatureLayout(format!(
                    "active position {last} outside dimension {dimension}"
                )));
            }
        }
        Ok(Self { dimension, active })
    }

    /// Recover from a dense 0/1 row
    pub fn from_dense(row: &[i32]) -> Result<Self> {
        let mut active = Vec::new();
        for (i, &v) in row.iter().enumerate() {
            match v {
                0 => {}
                1 => active.push(i),
                other => {
                    return Err(DsreError::FeatureLayout(format!(
                        "flat feature value {other} at position {i}"
                    )))
                }
            }
        }
        Ok(Self {
            dimension: row.len(),
            active,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn active(&self) -> &[usize] {
        &self.active
    }

    pub fn is_active(&self, position: usize) -> bool {
        self.active.binary_search(&position).is_ok()
    }

    pub fn to_dense(&self) -> Vec<i32> {
        let mut row = vec![0; self.dimension];
        for &i in &self.active {
            row[i] = 1;
        }
        row
    }
}

// ============================================================================
// Sequence Features
// ============================================================================

/// Padded type and word id sequences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SequenceRecord")]
pub struct SequenceFeatures {
    type_ids: Vec<i32>,
    word_ids: Vec<i32>,
    type_len: i32,
    word_len: i32,
}

#[derive(Deserialize)]
struct SequenceRecord {
    type_ids: Vec<i32>,
    word_ids: Vec<i32>,
    type_len: i32,
    word_len: i32,
}

impl TryFrom<SequenceRecord> for SequenceFeatures {
    type Error = DsreError;

    fn try_from(record: SequenceRecord) -> Result<Self> {
        if record.type_ids.len() != SEQUENCE_LENGTH || record.word_ids.len() != SEQUENCE_LENGTH {
            return Err(DsreError::FeatureLayout(format!(
                "sequence ids have lengths {}/{}, expected {SEQUENCE_LENGTH}",
                record.type_ids.len(),
                record.word_ids.len()
            )));
        }
        let mut slots = record.type_ids;
        slots.extend(record.word_ids);
        slots.push(record.type_len);
        slots.push(record.word_len);
        Self::from_slots(&slots)
    }
}

impl SequenceFeatures {
    /// Truncate both id lists to [`SEQUENCE_LENGTH`] and pad the remainder
    pub fn new(type_ids: &[usize], word_ids: &[usize], type_padding: usize, word_padding: usize) -> Self {
        let (type_ids, type_len) = pad(type_ids, type_padding);
        let (word_ids, word_len) = pad(word_ids, word_padding);
        Self {
            type_ids,
            word_ids,
            type_len,
            word_len,
        }
    }

    /// Parse a `[types | words | type_len | word_len]` row
    pub fn from_slots(slots: &[i32]) -> Result<Self> {
        if slots.len() != SEQUENCE_SLOTS {
            return Err(DsreError::FeatureLayout(format!(
                "sequence row has {} slots, expected {SEQUENCE_SLOTS}",
                slots.len()
            )));
        }
        let type_len = slots[2 * SEQUENCE_LENGTH];
        let word_len = slots[2 * SEQUENCE_LENGTH + 1];
        for len in [type_len, word_len] {
            if len < 0 || len as usize > SEQUENCE_LENGTH {
                return Err(DsreError::FeatureLayout(format!(
                    "sequence length {len} outside 0..={SEQUENCE_LENGTH}"
                )));
            }
        }
        Ok(Self {
            type_ids: slots[..SEQUENCE_LENGTH].to_vec(),
            word_ids: slots[SEQUENCE_LENGTH..2 * SEQUENCE_LENGTH].to_vec(),
            type_len,
            word_len,
        })
    }

    /// All type slots, padding included
    pub fn type_ids(&self) -> &[i32] {
        &self.type_ids
    }

    /// All word slots, padding included
    pub fn word_ids(&self) -> &[i32] {
        &self.word_ids
    }

    pub fn type_len(&self) -> usize {
        self.type_len as usize
    }

    pub fn word_len(&self) -> usize {
        self.word_len as usize
    }

    pub fn to_slots(&self) -> Vec<i32> {
        let mut slots = Vec::with_capacity(SEQUENCE_SLOTS);
        slots.extend_from_slice(&self.type_ids);
        slots.extend_from_slice(&self.word_ids);
        slots.push(self.type_len);
        slots.push(self.word_len);
        slots
    }
}

fn pad(ids: &[usize], padding: usize) -> (Vec<i32>, i32) {
    let len = ids.len().min(SEQUENCE_LENGTH);
    let mut padded: Vec<i32> = ids[..len].iter().map(|&id| id as i32).collect();
    padded.resize(SEQUENCE_LENGTH, padding as i32);
    (padded, len as i32)
}

// ============================================================================
// Features
// ============================================================================

/// Encoded features of one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum Features {
    Flat(FlatFeatures),
    Sequence(SequenceFeatures),
}

impl Features {
    /// Dense integer row for the trainer
    pub fn to_row(&self) -> Vec<i32> {
        match self {
            Self::Flat(flat) => flat.to_dense(),
            Self::Sequence(seq) => seq.to_slots(),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Self::Flat(flat) => flat.dimension(),
            Self::Sequence(_) => SEQUENCE_SLOTS,
        }
    }

    pub fn kind(&self) -> EncodingKind {
        match self {
            Self::Flat(_) => EncodingKind::Flat,
            Self::Sequence(_) => EncodingKind::Sequence,
        }
    }
}

// ============================================================================
// Encoders
// ============================================================================

impl FeatureEncoder for VocabularySet {
    fn encode(&self, tokens: &PathTokens) -> Features {
        let blocks = [
            (&self.dependency_paths, std::slice::from_ref(&tokens.dependency_path)),
            (&self.dependency_words, tokens.dependency_words.as_slice()),
            (&self.dependency_elements, tokens.dependency_elements.as_slice()),
            (&self.between_words, tokens.between_words.as_slice()),
        ];

        let mut active = Vec::new();
        let mut offset = 0;
        for (vocabulary, terms) in blocks {
            active.extend(vocabulary.lookup(terms).map(|i| offset + i));
            offset += vocabulary.len();
        }

        active.sort_unstable();
        active.dedup();
        Features::Flat(FlatFeatures {
            dimension: offset,
            active,
        })
    }

    fn width(&self) -> usize {
        self.dependency_paths.len()
            + self.dependency_words.len()
            + self.dependency_elements.len()
            + self.between_words.len()
    }

    fn kind(&self) -> EncodingKind {
        EncodingKind::Flat
    }
}

impl FeatureEncoder for SequenceVocabularies {
    fn encode(&self, tokens: &PathTokens) -> Features {
        let type_ids: Vec<usize> = tokens
            .dependency_types
            .iter()
            .map(|t| self.types.id_or_unknown(t))
            .collect();
        let word_ids: Vec<usize> = tokens
            .dependency_words
            .iter()
            .map(|w| self.words.id_or_unknown(w))
            .collect();

        Features::Sequence(SequenceFeatures::new(
            &type_ids,
            &word_ids,
            self.types.padding_id(),
            self.words.padding_id(),
        ))
    }

    fn width(&self) -> usize {
        SEQUENCE_SLOTS
    }

    fn kind(&self) -> EncodingKind {
        EncodingKind::Sequence
    }
}

impl FeatureEncoder for Vocabularies {
    fn encode(&self, tokens: &PathTokens) -> Features {
        match self {
            Self::Flat(set) => set.encode(tokens),
            Self::Sequence(seq) => seq.encode(tokens),
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Flat(set) => set.width(),
            Self::Sequence(seq) => seq.width(),
        }
    }

    fn kind(&self) -> EncodingKind {
        Vocabularies::kind(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
