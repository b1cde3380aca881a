//! Typed feature vectors and submission validation
//!
//! A submission is an untyped JSON object. It is turned into a
//! [`FeatureVector`] before any model code runs: every required feature must
//! be present and hold a finite, non-negative number (or a string that parses
//! as one). Fields are checked in model order and the first failure wins.

use crate::error::ValidationError;
use serde_json::{Map, Value};

/// Output classes of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    Benign,
    Malignant,
}

impl Diagnosis {
    /// Dataset/model class indicator: 1 = benign, 0 = malignant
    pub fn from_indicator(indicator: i64) -> Option<Self> {
        match indicator {
            1 => Some(Diagnosis::Benign),
            0 => Some(Diagnosis::Malignant),
            _ => None,
        }
    }

    pub fn is_benign(self) -> bool {
        self == Diagnosis::Benign
    }

    pub fn label(self) -> &'static str {
        match self {
            Diagnosis::Benign => "Benign",
            Diagnosis::Malignant => "Malignant",
        }
    }
}

/// Validated measurements for one sample, in the model's feature order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Validate a JSON submission against the required feature names
    pub fn from_submission(
        submission: &Value,
        required: &[String],
    ) -> Result<Self, ValidationError> {
        let object = submission.as_object().ok_or(ValidationError::NotAnObject)?;
        Self::from_map(object, required)
    }

    pub fn from_map(
        submission: &Map<String, Value>,
        required: &[String],
    ) -> Result<Self, ValidationError> {
        let mut values = Vec::with_capacity(required.len());
        for name in required {
            let raw = submission
                .get(name)
                .ok_or_else(|| ValidationError::Missing(name.clone()))?;
            let value = parse_measurement(raw).ok_or_else(|| ValidationError::Invalid(name.clone()))?;
            values.push(value);
        }
        Ok(Self {
            names: required.to_vec(),
            values,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }
}

/// Numbers and numeric strings are accepted; anything non-finite or negative is not.
fn parse_measurement(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}
