//! DSRE Eval - Document-grouped cross-validation
//!
//! Splits a corpus into folds by document id, builds fold-local training
//! sets and vocabularies, hands the resulting matrices to a pluggable
//! `ModelTrainer` and collects per-fold test probabilities.

use std::path::Path;

use ndarray::Array2;

use dsre_core::{DsreError, RelationSchema, Result};
use dsre_extractor::Instance;

pub mod cross_validation;
pub mod folds;
pub mod scratch;

pub use cross_validation::{CrossValidator, FoldOutcome};
pub use folds::{DocumentFolds, Fold};
pub use scratch::{prepare_scratch_dir, prepare_scratch_dir_at, scratch_dir_name};

// ============================================================================
// Training Data
// ============================================================================

/// Feature and label matrices, one row per instance
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub features: Array2<i32>,
    pub labels: Array2<i8>,
}

impl TrainingData {
    /// Stack encoded instances into `(n, feature_width)` and `(n, label_width)`
    pub fn from_instances(
        instances: &[Instance],
        feature_width: usize,
        label_width: usize,
    ) -> Result<Self> {
        let mut features = Vec::with_capacity(instances.len() * feature_width);
        let mut labels = Vec::with_capacity(instances.len() * label_width);

        for instance in instances {
            let row = instance.feature_row()?;
            if row.len() != feature_width {
                return Err(DsreError::FeatureLayout(format!(
                    "{} has {} features, expected {feature_width}",
                    instance.describe(),
                    row.len()
                )));
            }
            if instance.labels().len() != label_width {
                return Err(DsreError::LabelLength {
                    expected: label_width,
                    actual: instance.labels().len(),
                });
            }
            features.extend(row);
            labels.extend(instance.labels().values());
        }

        let n = instances.len();
        Ok(Self {
            features: Array2::from_shape_vec((n, feature_width), features)
                .map_err(|e| DsreError::FeatureLayout(e.to_string()))?,
            labels: Array2::from_shape_vec((n, label_width), labels)
                .map_err(|e| DsreError::FeatureLayout(e.to_string()))?,
        })
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }
}

// ============================================================================
// Trainer Trait
// ============================================================================

/// Trait for the model behind cross-validation
pub trait ModelTrainer: Send + Sync {
    type Model;

    /// Fit a model; `work_dir` is an empty fold-private directory
    fn train(
        &self,
        train: &TrainingData,
        test: &TrainingData,
        hidden_layers: &[usize],
        work_dir: &Path,
        schema: &RelationSchema,
    ) -> Result<Self::Model>;

    /// Per-relation probabilities, shape `(test rows, schema length)`
    fn predict(&self, test: &TrainingData, model: &Self::Model) -> Result<Array2<f32>>;
}
