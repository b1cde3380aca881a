//! Classifier seam and the persisted logistic-regression model

use crate::error::{ClassifierError, Result};
use crate::features::{Diagnosis, FeatureVector};
use linfa::traits::Predict;
use linfa_logistic::FittedLogisticRegression;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bumped whenever the on-disk layout of [`ModelArtifact`] changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Model output for one feature vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub diagnosis: Diagnosis,
    /// Probability of the benign class, in [0, 1]
    pub benign_probability: f64,
}

/// Anything that can score a validated feature vector
pub trait Classifier: Send + Sync {
    /// Required feature names, in the order the model expects them
    fn feature_names(&self) -> &[String];

    fn predict(&self, features: &FeatureVector) -> Result<Prediction>;

    /// Facts recorded when the model was fitted, if known
    fn metadata(&self) -> Option<&TrainingMetadata> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_rows: usize,
    pub holdout_rows: usize,
    pub holdout_accuracy: Option<f64>,
    pub max_iterations: u64,
    pub alpha: f64,
    pub seed: u64,
}

/// Everything needed to score a sample, as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    /// Per-feature standardization: `(x - mean) / scale`
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    /// Fitted on standardized records; `true` is benign
    pub model: FittedLogisticRegression<f64, bool>,
    pub metadata: TrainingMetadata,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let artifact: ModelArtifact = rmp_serde::from_slice(&bytes)?;
        artifact.check()?;
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.check()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = rmp_serde::to_vec_named(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ClassifierError::Model {
                message: format!(
                    "Unsupported model artifact version {} (expected {})",
                    self.format_version, ARTIFACT_FORMAT_VERSION
                ),
            });
        }
        let n = self.feature_names.len();
        if n == 0
            || self.means.len() != n
            || self.scales.len() != n
            || self.model.params().len() != n
        {
            return Err(ClassifierError::Model {
                message: format!(
                    "Model artifact is inconsistent: {} feature names, {} means, {} scales, {} weights",
                    n,
                    self.means.len(),
                    self.scales.len(),
                    self.model.params().len()
                ),
            });
        }
        Ok(())
    }

    pub fn standardize(&self, values: &[f64]) -> Array1<f64> {
        values
            .iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }
}

/// Standardized logistic regression backed by [`linfa_logistic`]
#[derive(Debug, Clone)]
pub struct LogisticModel {
    artifact: ModelArtifact,
}

impl LogisticModel {
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        artifact.check()?;
        Ok(Self { artifact })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(ModelArtifact::load(path)?)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl Classifier for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        if features.names() != self.artifact.feature_names.as_slice() {
            return Err(ClassifierError::Model {
                message: "Feature vector does not match the model's feature order".into(),
            });
        }

        let row = self.artifact.standardize(features.values());
        let n = row.len();
        let records = row
            .into_shape_with_order((1, n))
            .map_err(|e| ClassifierError::Model {
                message: format!("Failed to shape feature vector: {}", e),
            })?;

        let classes: Array1<bool> = self.artifact.model.predict(&records);
        let positive = self.artifact.model.predict_probabilities(&records);
        let (Some(&is_benign), Some(&p)) = (classes.first(), positive.first()) else {
            return Err(ClassifierError::Model {
                message: "Model returned no prediction".into(),
            });
        };
        if !p.is_finite() {
            return Err(ClassifierError::Model {
                message: format!("Model returned a non-finite probability: {}", p),
            });
        }

        // The predicted class is always the more likely one.
        let predicted = p.max(1.0 - p).clamp(0.0, 1.0);
        let benign_probability = if is_benign { predicted } else { 1.0 - predicted };

        Ok(Prediction {
            diagnosis: if is_benign {
                Diagnosis::Benign
            } else {
                Diagnosis::Malignant
            },
            benign_probability,
        })
    }

    fn metadata(&self) -> Option<&TrainingMetadata> {
        Some(&self.artifact.metadata)
    }
}

/// Stack `(n_rows, n_features)` into standardized records with the artifact's scaling
pub fn standardize_records(records: &Array2<f64>, means: &[f64], scales: &[f64]) -> Array2<f64> {
    let mut out = records.clone();
    for (mut column, (mean, scale)) in out
        .columns_mut()
        .into_iter()
        .zip(means.iter().zip(scales.iter()))
    {
        column.mapv_inplace(|x| (x - mean) / scale);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_records_by_column() {
        let records = ndarray::array![[1.0, 10.0], [3.0, 30.0]];
        let out = standardize_records(&records, &[2.0, 20.0], &[1.0, 10.0]);
        assert_eq!(out, ndarray::array![[-1.0, -1.0], [1.0, 1.0]]);
    }
}
