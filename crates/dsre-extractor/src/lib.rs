//! DSRE Extractor - Instance labeling and feature encoding
//!
//! Turns entity-pair candidates into labeled relation instances using a
//! distant-supervision knowledge base, builds frequency-pruned vocabularies
//! from the instances' dependency-path tokens and encodes each instance as
//! either a flat multi-hot vector or padded id sequences.

pub mod dataset;
pub mod features;
pub mod instance;
pub mod labeler;
pub mod vocabulary;

pub use dataset::{
    build_prediction_instances, build_test_instances, build_training_set, build_vocabularies,
    TrainingSet,
};
pub use features::{
    FeatureEncoder, Features, FlatFeatures, SequenceFeatures, SEQUENCE_LENGTH, SEQUENCE_SLOTS,
};
pub use instance::{Instance, InstanceRecord, PathTokens};
pub use labeler::{
    Candidate, CandidateLabeler, EntityFilter, LabeledBatch, Supervision, DEFAULT_GENE_TAG,
};
pub use vocabulary::{
    build_dataset, load_embedding_vocabulary, SentinelVocabulary, SequenceVocabularies,
    Vocabularies, Vocabulary, VocabularyBuilder, VocabularyCorpora, VocabularySet,
    DEFAULT_MIN_OCCURRENCE, PADDING_WORD, UNKNOWN_WORD,
};
