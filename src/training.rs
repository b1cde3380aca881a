//! Fit the classifier from the CSV dataset and persist it

use crate::config::Config;
use crate::dataset::{DatasetSource, TrainingTable};
use crate::error::{ClassifierError, Result};
use crate::features::Diagnosis;
use crate::model::{
    ARTIFACT_FORMAT_VERSION, LogisticModel, ModelArtifact, TrainingMetadata, standardize_records,
};
use linfa::Dataset;
use linfa::metrics::ToConfusionMatrix;
use linfa::traits::{Fit, Predict};
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, warn};

/// Standard deviations below this are treated as constant columns
const MIN_SCALE: f64 = 1e-12;

/// Load the persisted model, training and saving it first if the artifact is absent
pub fn load_or_train(config: &Config) -> Result<LogisticModel> {
    let path = &config.model.artifact_path;
    if !path.exists() {
        warn!(
            "Model artifact {} not found, training from {}",
            path.display(),
            config.dataset.path.display()
        );
        train_and_save(config)?;
    }
    let model = LogisticModel::load(path)?;
    info!(
        "Loaded model from {} ({} features)",
        path.display(),
        model.artifact().feature_names.len()
    );
    Ok(model)
}

/// Train on the configured dataset and write the artifact
pub fn train_and_save(config: &Config) -> Result<ModelArtifact> {
    let source = DatasetSource::new(&config.dataset.path, &config.dataset.label_column);
    let table = source.training_table()?;
    let artifact = train(&table, config)?;
    artifact.save(&config.model.artifact_path)?;
    info!(
        "Saved model artifact to {}",
        config.model.artifact_path.display()
    );
    Ok(artifact)
}

/// Fit a standardized logistic regression on `table`
pub fn train(table: &TrainingTable, config: &Config) -> Result<ModelArtifact> {
    let n_rows = table.records.nrows();
    let mut order: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(config.model.seed);
    order.shuffle(&mut rng);

    let holdout_rows = ((n_rows as f64) * config.model.holdout_ratio).floor() as usize;
    let (holdout_idx, train_idx) = order.split_at(holdout_rows);
    if train_idx.is_empty() {
        return Err(ClassifierError::Dataset {
            message: "No rows left for training after the holdout split".into(),
        });
    }

    let (train_x, train_y) = select_rows(table, train_idx);
    let means = train_x
        .mean_axis(Axis(0))
        .ok_or_else(|| ClassifierError::Dataset {
            message: "Cannot compute feature means of an empty table".into(),
        })?
        .to_vec();
    let scales: Vec<f64> = train_x
        .std_axis(Axis(0), 0.0)
        .iter()
        .map(|&s| if s > MIN_SCALE { s } else { 1.0 })
        .collect();

    let train_set = Dataset::new(standardize_records(&train_x, &means, &scales), train_y);
    let model = LogisticRegression::<f64>::default()
        .alpha(config.model.alpha)
        .max_iterations(config.model.max_iterations)
        .fit(&train_set)
        .map_err(|e| ClassifierError::Model {
            message: format!("Logistic regression failed to fit: {}", e),
        })?;

    let holdout_accuracy = if holdout_idx.is_empty() {
        None
    } else {
        let (test_x, test_y) = select_rows(table, holdout_idx);
        let test_set = Dataset::new(standardize_records(&test_x, &means, &scales), test_y);
        let predicted: Array1<bool> = model.predict(test_set.records());
        let matrix = predicted
            .confusion_matrix(&test_set)
            .map_err(|e| ClassifierError::Model {
                message: format!("Failed to score holdout split: {}", e),
            })?;
        Some(f64::from(matrix.accuracy()))
    };

    info!(
        "Trained on {} rows, {} held out, holdout accuracy {}",
        train_idx.len(),
        holdout_idx.len(),
        holdout_accuracy
            .map(|a| format!("{:.4}", a))
            .unwrap_or_else(|| "n/a".to_string())
    );

    Ok(ModelArtifact {
        format_version: ARTIFACT_FORMAT_VERSION,
        feature_names: table.feature_names.clone(),
        means,
        scales,
        model,
        metadata: TrainingMetadata {
            trained_rows: train_idx.len(),
            holdout_rows: holdout_idx.len(),
            holdout_accuracy,
            max_iterations: config.model.max_iterations,
            alpha: config.model.alpha,
            seed: config.model.seed,
        },
    })
}

fn select_rows(table: &TrainingTable, idx: &[usize]) -> (Array2<f64>, Array1<bool>) {
    let records = table.records.select(Axis(0), idx);
    let targets = idx
        .iter()
        .map(|&i| table.labels[i] == Diagnosis::Benign)
        .collect();
    (records, targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use crate::model::Classifier;
    use serde_json::json;

    fn separable_table() -> TrainingTable {
        // benign rows are small, malignant rows are large
        let mut flat = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.1;
            if i % 2 == 0 {
                flat.extend([10.0 + jitter, 15.0 - jitter]);
                labels.push(Diagnosis::Benign);
            } else {
                flat.extend([22.0 + jitter, 28.0 - jitter]);
                labels.push(Diagnosis::Malignant);
            }
        }
        TrainingTable {
            feature_names: vec!["mean radius".into(), "mean texture".into()],
            records: Array2::from_shape_vec((40, 2), flat).unwrap(),
            labels,
        }
    }

    #[test]
    fn test_train_separates_obvious_cases() {
        let artifact = train(&separable_table(), &Config::default()).unwrap();
        assert_eq!(artifact.metadata.trained_rows, 32);
        assert_eq!(artifact.metadata.holdout_rows, 8);
        assert_eq!(artifact.metadata.holdout_accuracy, Some(1.0));

        let model = LogisticModel::new(artifact).unwrap();
        let names = model.feature_names().to_vec();

        let small = FeatureVector::from_submission(
            &json!({"mean radius": 10.2, "mean texture": 14.8}),
            &names,
        )
        .unwrap();
        let prediction = model.predict(&small).unwrap();
        assert_eq!(prediction.diagnosis, Diagnosis::Benign);
        assert!(prediction.benign_probability > 0.5);

        let large = FeatureVector::from_submission(
            &json!({"mean radius": 23.0, "mean texture": 27.5}),
            &names,
        )
        .unwrap();
        let prediction = model.predict(&large).unwrap();
        assert_eq!(prediction.diagnosis, Diagnosis::Malignant);
        assert!(prediction.benign_probability < 0.5);
    }

    #[test]
    fn test_no_holdout_skips_accuracy() {
        let mut config = Config::default();
        config.model.holdout_ratio = 0.0;
        let artifact = train(&separable_table(), &config).unwrap();
        assert_eq!(artifact.metadata.trained_rows, 40);
        assert_eq!(artifact.metadata.holdout_accuracy, None);
    }

    #[test]
    fn test_training_is_deterministic_for_a_seed() {
        let a = train(&separable_table(), &Config::default()).unwrap();
        let b = train(&separable_table(), &Config::default()).unwrap();
        assert_eq!(a.means, b.means);
        assert_eq!(a.model.params(), b.model.params());
    }
}
