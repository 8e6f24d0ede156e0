//! Fold execution

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;

use dsre_core::{CrossValidationConfig, DsreError, Result, Sentence};
use dsre_extractor::{
    build_test_instances, build_training_set, CandidateLabeler, FeatureEncoder, Instance,
    VocabularyBuilder,
};

use crate::folds::DocumentFolds;
use crate::scratch::prepare_scratch_dir;
use crate::{ModelTrainer, TrainingData};

/// Result of one held-out fold
#[derive(Debug, Clone)]
pub struct FoldOutcome {
    pub fold_index: usize,
    /// `(test instances, relations)` probabilities
    pub probabilities: Array2<f32>,
    pub instances: Vec<Instance>,
    /// Document id -> indices into `instances`
    pub document_groups: BTreeMap<String, Vec<usize>>,
    pub scratch_dir: PathBuf,
}

/// Runs folds with a shared labeler and vocabulary settings
#[derive(Debug, Clone)]
pub struct CrossValidator<'a> {
    labeler: CandidateLabeler<'a>,
    builder: VocabularyBuilder,
    hidden_layers: Vec<usize>,
    scratch_root: PathBuf,
}

impl<'a> CrossValidator<'a> {
    pub fn new(labeler: CandidateLabeler<'a>, builder: VocabularyBuilder) -> Self {
        Self::from_config(labeler, builder, &CrossValidationConfig::default())
    }

    pub fn from_config(
        labeler: CandidateLabeler<'a>,
        builder: VocabularyBuilder,
        config: &CrossValidationConfig,
    ) -> Self {
        Self {
            labeler,
            builder,
            hidden_layers: config.hidden_layers.clone(),
            scratch_root: config.scratch_root.clone(),
        }
    }

    pub fn with_hidden_layers(mut self, hidden_layers: Vec<usize>) -> Self {
        self.hidden_layers = hidden_layers;
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Train on every chunk but `fold_index`, predict the held-out chunk
    pub fn run_fold<T: ModelTrainer>(
        &self,
        trainer: &T,
        folds: &DocumentFolds,
        sentences: &[Arc<Sentence>],
        fold_index: usize,
    ) -> Result<FoldOutcome> {
        let fold = folds.fold(fold_index)?;
        let (train_sentences, test_sentences) = fold.route(sentences);
        tracing::debug!(
            fold = fold_index,
            "Routed {} training and {} test sentences",
            train_sentences.len(),
            test_sentences.len()
        );

        let training = build_training_set(&train_sentences, &self.labeler, &self.builder)?;
        let instances = build_test_instances(&test_sentences, &self.labeler, &training.vocabularies)?;

        let mut document_groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, instance) in instances.iter().enumerate() {
            document_groups
                .entry(instance.document_id().to_string())
                .or_default()
                .push(i);
        }

        let relations = self.labeler.schema().len();
        let width = training.vocabularies.width();
        let train_data = TrainingData::from_instances(&training.instances, width, relations)?;
        let test_data = TrainingData::from_instances(&instances, width, relations)?;

        let scratch_dir = prepare_scratch_dir(&self.scratch_root, fold_index)?;
        let model = trainer.train(
            &train_data,
            &test_data,
            &self.hidden_layers,
            &scratch_dir,
            self.labeler.schema(),
        )?;
        let probabilities = trainer.predict(&test_data, &model)?;

        if probabilities.dim() != (instances.len(), relations) {
            return Err(DsreError::Trainer(format!(
                "fold {fold_index}: predictions have shape {:?}, expected ({}, {relations})",
                probabilities.dim(),
                instances.len()
            )));
        }

        tracing::info!(
            fold = fold_index,
            train = train_data.len(),
            test = test_data.len(),
            documents = document_groups.len(),
            "Fold complete"
        );
        Ok(FoldOutcome {
            fold_index,
            probabilities,
            instances,
            document_groups,
            scratch_dir,
        })
    }

    /// Run every fold in parallel, outcomes in fold order
    pub fn run_all_folds<T: ModelTrainer>(
        &self,
        trainer: &T,
        folds: &DocumentFolds,
        sentences: &[Arc<Sentence>],
    ) -> Result<Vec<FoldOutcome>> {
        (0..folds.len())
            .into_par_iter()
            .map(|i| self.run_fold(trainer, folds, sentences, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsre_core::{Dependency, EncodingKind, EntityPair, MentionSpan, RelationSchema, Token};
    use dsre_kb::{KnowledgeBaseIndex, RelationTuples};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Predicts the label matrix back as probabilities
    struct EchoTrainer {
        trained: AtomicUsize,
        wrong_shape: bool,
    }

    impl EchoTrainer {
        fn new() -> Self {
            Self {
                trained: AtomicUsize::new(0),
                wrong_shape: false,
            }
        }
    }

    impl ModelTrainer for EchoTrainer {
        type Model = usize;

        fn train(
            &self,
            train: &TrainingData,
            _test: &TrainingData,
            hidden_layers: &[usize],
            work_dir: &Path,
            schema: &RelationSchema,
        ) -> Result<usize> {
            assert!(work_dir.is_dir());
            assert_eq!(hidden_layers, &[8]);
            assert_eq!(train.labels.ncols(), schema.len());
            self.trained.fetch_add(1, Ordering::SeqCst);
            Ok(train.len())
        }

        fn predict(&self, test: &TrainingData, _model: &usize) -> Result<Array2<f32>> {
            let probabilities = test.labels.mapv(|v| v.max(0) as f32);
            if self.wrong_shape {
                return Ok(Array2::zeros((test.len() + 1, 1)));
            }
            Ok(probabilities)
        }
    }

    fn sentence(doc: &str) -> Arc<Sentence> {
        let mut s = Sentence::new(doc, "0");
        s.add_token(Token::new(1, "P1", "P1", "NN", "GENE").with_normalized_ner("P1"));
        s.add_token(Token::new(2, "activates", "activate", "VBZ", "O"));
        s.add_token(Token::new(3, "P2", "P2", "NN", "GENE").with_normalized_ner("P2"));
        s.add_dependency(Dependency::new("nsubj", 2, 1));
        s.add_dependency(Dependency::new("dobj", 2, 3));
        s.add_entity_pair(EntityPair::new(MentionSpan::single(1), MentionSpan::single(3)));
        Arc::new(s)
    }

    fn knowledge_base() -> KnowledgeBaseIndex {
        let mut kb = KnowledgeBaseIndex::new();
        let mut tuples = RelationTuples::default();
        tuples.forward.insert(("P1".to_string(), "P2".to_string()));
        kb.insert("activates", tuples);
        kb
    }

    #[test]
    fn test_run_all_folds() {
        let kb = knowledge_base();
        let schema = RelationSchema::new(["activates"]).unwrap();
        let labeler = CandidateLabeler::supervised(&kb, &schema).unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let validator = CrossValidator::new(
            labeler,
            VocabularyBuilder::new(EncodingKind::Flat).with_min_occurrence(None),
        )
        .with_hidden_layers(vec![8])
        .with_scratch_root(scratch.path());

        let sentences: Vec<Arc<Sentence>> =
            ["d0", "d1", "d1", "d2", "d3"].iter().map(|d| sentence(d)).collect();
        let folds = DocumentFolds::new(["d0", "d1", "d2", "d3"], 2).unwrap();
        let trainer = EchoTrainer::new();

        let outcomes = validator.run_all_folds(&trainer, &folds, &sentences).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(trainer.trained.load(Ordering::SeqCst), 2);

        let first = &outcomes[0];
        assert_eq!(first.fold_index, 0);
        // d0 (1 sentence) + d1 (2 sentences), 2 instances each
        assert_eq!(first.instances.len(), 6);
        assert_eq!(first.probabilities.dim(), (6, 1));
        assert_eq!(first.document_groups["d0"], vec![0, 1]);
        assert_eq!(first.document_groups["d1"], vec![2, 3, 4, 5]);
        assert!(first.scratch_dir.starts_with(scratch.path()));
        assert_eq!(first.probabilities[[0, 0]], 1.0);
        assert_eq!(first.probabilities[[1, 0]], 0.0);
    }

    #[test]
    fn test_prediction_shape_checked() {
        let kb = knowledge_base();
        let schema = RelationSchema::new(["activates"]).unwrap();
        let labeler = CandidateLabeler::supervised(&kb, &schema).unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let validator = CrossValidator::new(labeler, VocabularyBuilder::new(EncodingKind::Sequence))
            .with_hidden_layers(vec![8])
            .with_scratch_root(scratch.path());

        let sentences = vec![sentence("d0"), sentence("d1")];
        let folds = DocumentFolds::new(["d0", "d1"], 2).unwrap();
        let trainer = EchoTrainer {
            wrong_shape: true,
            ..EchoTrainer::new()
        };

        let err = validator.run_fold(&trainer, &folds, &sentences, 1).unwrap_err();
        assert!(matches!(err, DsreError::Trainer(_)));
    }
}
