//! Request operations, independent of the HTTP transport
//!
//! [`ServiceContext`] is built once at startup and never mutated, so handlers
//! share it through an `Arc` without locking.

use crate::dataset::{DatasetSource, SampleCases};
use crate::error::Result;
use crate::features::{Diagnosis, FeatureVector};
use crate::model::{Classifier, TrainingMetadata};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub const DISCLAIMER: &str = "For academic purposes only. Seek medical advice for diagnosis.";

/// Scored submission returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub label: &'static str,
    pub is_benign: bool,
    /// Percentage for the predicted class, two decimals
    pub confidence: f64,
    pub description: &'static str,
    pub disclaimer: &'static str,
}

impl Assessment {
    /// `benign_probability` is clamped into [0, 1]
    pub fn new(diagnosis: Diagnosis, benign_probability: f64) -> Self {
        let p = benign_probability.clamp(0.0, 1.0);
        let score = if diagnosis.is_benign() { p } else { 1.0 - p };
        let description = match diagnosis {
            Diagnosis::Benign => "Analysis complete: The tumor is likely BENIGN.",
            Diagnosis::Malignant => "Analysis complete: The tumor is likely MALIGNANT.",
        };
        Self {
            label: diagnosis.label(),
            is_benign: diagnosis.is_benign(),
            confidence: round2(score * 100.0),
            description,
            disclaimer: DISCLAIMER,
        }
    }
}

/// Nearest two-decimal value of the exact binary `value`; scaling by 100 first
/// would manufacture `.5` ties that are not there
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Model facts exposed on `/info`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub feature_count: usize,
    pub model_path: Option<PathBuf>,
    pub dataset_path: PathBuf,
    pub training: Option<TrainingMetadata>,
}

/// Immutable state shared by every request
pub struct ServiceContext {
    classifier: Arc<dyn Classifier>,
    dataset: DatasetSource,
    model_path: Option<PathBuf>,
}

impl ServiceContext {
    pub fn new(classifier: Arc<dyn Classifier>, dataset: DatasetSource) -> Self {
        Self {
            classifier,
            dataset,
            model_path: None,
        }
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Ordered feature names for building the input form
    pub fn feature_names(&self) -> &[String] {
        self.classifier.feature_names()
    }

    /// Validate a raw submission and score it
    pub fn score(&self, submission: &Value) -> Result<Assessment> {
        let features = FeatureVector::from_submission(submission, self.feature_names())?;
        let prediction = self.classifier.predict(&features)?;
        tracing::debug!(
            "Predicted {} (benign probability {:.4})",
            prediction.diagnosis.label(),
            prediction.benign_probability
        );
        Ok(Assessment::new(
            prediction.diagnosis,
            prediction.benign_probability,
        ))
    }

    /// One random example per class; reads the CSV, so call from a blocking context
    pub fn sample_cases(&self) -> Result<SampleCases> {
        self.dataset.sample_cases(&mut rand::rng())
    }

    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            feature_count: self.feature_names().len(),
            model_path: self.model_path.clone(),
            dataset_path: self.dataset.path().to_path_buf(),
            training: self.classifier.metadata().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClassifierError, ValidationError};
    use crate::model::Prediction;
    use serde_json::json;

    struct FixedClassifier {
        names: Vec<String>,
        output: Prediction,
    }

    impl Classifier for FixedClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, _features: &FeatureVector) -> Result<Prediction> {
            Ok(self.output)
        }
    }

    fn context(diagnosis: Diagnosis, p: f64) -> ServiceContext {
        let classifier = FixedClassifier {
            names: vec!["mean radius".into(), "mean area".into()],
            output: Prediction {
                diagnosis,
                benign_probability: p,
            },
        };
        ServiceContext::new(
            Arc::new(classifier),
            DatasetSource::new("/nonexistent.csv", "diagnosis"),
        )
    }

    #[test]
    fn test_benign_confidence_is_probability() {
        let out = context(Diagnosis::Benign, 0.92)
            .score(&json!({"mean radius": 12.0, "mean area": "500"}))
            .unwrap();
        assert_eq!(out.label, "Benign");
        assert!(out.is_benign);
        assert_eq!(out.confidence, 92.0);
        assert_eq!(out.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_malignant_confidence_is_complement() {
        let out = context(Diagnosis::Malignant, 0.1234)
            .score(&json!({"mean radius": 20.0, "mean area": 1200.0}))
            .unwrap();
        assert_eq!(out.label, "Malignant");
        assert!(!out.is_benign);
        assert_eq!(out.confidence, 87.66);
        assert!(out.description.contains("MALIGNANT"));
    }

    #[test]
    fn test_confidence_rounds_from_exact_value() {
        assert_eq!(Assessment::new(Diagnosis::Benign, 0.00015).confidence, 0.01);
        assert_eq!(Assessment::new(Diagnosis::Benign, 0.00045).confidence, 0.04);
        assert_eq!(Assessment::new(Diagnosis::Malignant, 0.5).confidence, 50.0);
        assert_eq!(round2(2.675), 2.67);
    }

    #[test]
    fn test_confidence_stays_in_range() {
        for p in [-0.5, 0.0, 0.333333, 0.5, 0.999999, 1.0, 1.7] {
            for diagnosis in [Diagnosis::Benign, Diagnosis::Malignant] {
                let a = Assessment::new(diagnosis, p);
                assert!((0.0..=100.0).contains(&a.confidence), "{p} -> {}", a.confidence);
            }
        }
    }

    #[test]
    fn test_validation_runs_before_model() {
        let err = context(Diagnosis::Benign, 0.5)
            .score(&json!({"mean radius": 12.0}))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::Validation(ValidationError::Missing(ref f)) if f == "mean area"
        ));
    }

    #[test]
    fn test_info_reports_features() {
        let info = context(Diagnosis::Benign, 0.5)
            .with_model_path("models/m.msgpack")
            .info();
        assert_eq!(info.feature_count, 2);
        assert_eq!(info.model_path, Some(PathBuf::from("models/m.msgpack")));
        assert!(info.training.is_none());
    }
}
