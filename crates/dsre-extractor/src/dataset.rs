//! Dataset construction passes
//!
//! Training builds vocabularies from its own corpora and encodes with them.
//! Test and prediction passes reuse the training vocabularies unchanged.

use std::sync::Arc;

use dsre_core::{Result, Sentence};

use crate::features::FeatureEncoder;
use crate::instance::Instance;
use crate::labeler::CandidateLabeler;
use crate::vocabulary::{Vocabularies, VocabularyBuilder};

/// Encoded training instances plus the vocabularies they were encoded with
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub instances: Vec<Instance>,
    pub vocabularies: Vocabularies,
}

/// Label, build vocabularies, then encode
pub fn build_training_set(
    sentences: &[Arc<Sentence>],
    labeler: &CandidateLabeler<'_>,
    builder: &VocabularyBuilder,
) -> Result<TrainingSet> {
    let batch = labeler.label_sentences(sentences)?;
    let vocabularies = builder.build(&batch.corpora);

    let mut instances = batch.instances;
    encode_all(&mut instances, &vocabularies);

    let positives = instances.iter().filter(|i| i.labels().has_positive()).count();
    tracing::info!(
        "Built training set: {} instances ({} with a positive label, {} candidates skipped)",
        instances.len(),
        positives,
        batch.skipped
    );
    Ok(TrainingSet {
        instances,
        vocabularies,
    })
}

/// Label and encode with existing vocabularies
pub fn build_test_instances(
    sentences: &[Arc<Sentence>],
    labeler: &CandidateLabeler<'_>,
    encoder: &dyn FeatureEncoder,
) -> Result<Vec<Instance>> {
    let mut instances = labeler.label_sentences(sentences)?.instances;
    encode_all(&mut instances, encoder);
    tracing::info!("Built {} test instances", instances.len());
    Ok(instances)
}

/// Encode without knowledge base lookups; every label is unknown
pub fn build_prediction_instances(
    sentences: &[Arc<Sentence>],
    labeler: &CandidateLabeler<'_>,
    encoder: &dyn FeatureEncoder,
) -> Result<Vec<Instance>> {
    let mut instances = labeler.unsupervised().label_sentences(sentences)?.instances;
    encode_all(&mut instances, encoder);
    tracing::info!("Built {} prediction instances", instances.len());
    Ok(instances)
}

/// Vocabulary-only pass over a corpus, ignoring labels
pub fn build_vocabularies(
    sentences: &[Arc<Sentence>],
    labeler: &CandidateLabeler<'_>,
    builder: &VocabularyBuilder,
) -> Result<Vocabularies> {
    let batch = labeler.unsupervised().label_sentences(sentences)?;
    Ok(builder.build(&batch.corpora))
}

fn encode_all(instances: &mut [Instance], encoder: &dyn FeatureEncoder) {
    for instance in instances.iter_mut() {
        instance.encode(encoder);
    }
}
