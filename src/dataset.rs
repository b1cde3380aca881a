//! CSV dataset access: full training table and per-class demo samples

use crate::error::{ClassifierError, Result};
use crate::features::Diagnosis;
use ndarray::Array2;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One dataset row keyed by feature name, label column removed
pub type SampleCase = BTreeMap<String, f64>;

/// One random example per class
#[derive(Debug, Clone, Serialize)]
pub struct SampleCases {
    pub benign_case: SampleCase,
    pub malignant_case: SampleCase,
}

/// Numeric rows ready for fitting
#[derive(Debug, Clone)]
pub struct TrainingTable {
    pub feature_names: Vec<String>,
    pub records: Array2<f64>,
    pub labels: Vec<Diagnosis>,
}

/// How `read` treats a row it cannot parse
#[derive(Debug, Clone, Copy)]
enum RowPolicy {
    Strict,
    SkipInvalid,
}

struct RawTable {
    feature_names: Vec<String>,
    rows: Vec<(Diagnosis, Vec<f64>)>,
}

/// Reads the CSV on every call; nothing is cached
#[derive(Debug, Clone)]
pub struct DatasetSource {
    path: PathBuf,
    label_column: String,
}

impl DatasetSource {
    pub fn new(path: impl Into<PathBuf>, label_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label_column: label_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every row as `f64` features plus its class
    pub fn training_table(&self) -> Result<TrainingTable> {
        let raw = self.read(RowPolicy::Strict)?;
        if raw.rows.is_empty() {
            return Err(ClassifierError::Dataset {
                message: format!("Dataset {} has no rows", self.path.display()),
            });
        }

        let n_rows = raw.rows.len();
        let n_cols = raw.feature_names.len();
        let mut flat = Vec::with_capacity(n_rows * n_cols);
        let mut labels = Vec::with_capacity(n_rows);
        for (label, values) in raw.rows {
            labels.push(label);
            flat.extend(values);
        }
        let records =
            Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| ClassifierError::Dataset {
                message: format!("Failed to shape dataset rows: {}", e),
            })?;

        Ok(TrainingTable {
            feature_names: raw.feature_names,
            records,
            labels,
        })
    }

    /// Pick one random benign and one random malignant row.
    /// Rows with an unknown label or a non-numeric cell are left out of the draw.
    pub fn sample_cases<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SampleCases> {
        let raw = self.read(RowPolicy::SkipInvalid)?;

        let pick = |wanted: Diagnosis, rng: &mut R| -> Result<SampleCase> {
            let candidates: Vec<&Vec<f64>> = raw
                .rows
                .iter()
                .filter(|(label, _)| *label == wanted)
                .map(|(_, values)| values)
                .collect();
            let chosen = candidates
                .choose(rng)
                .ok_or_else(|| ClassifierError::Dataset {
                    message: format!(
                        "No {} rows found in {}",
                        wanted.label().to_lowercase(),
                        self.path.display()
                    ),
                })?;
            Ok(raw
                .feature_names
                .iter()
                .cloned()
                .zip(chosen.iter().copied())
                .collect())
        };

        let benign_case = pick(Diagnosis::Benign, &mut *rng)?;
        let malignant_case = pick(Diagnosis::Malignant, &mut *rng)?;
        Ok(SampleCases {
            benign_case,
            malignant_case,
        })
    }

    fn read(&self, policy: RowPolicy) -> Result<RawTable> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| ClassifierError::Dataset {
            message: format!("Failed to open dataset {}: {}", self.path.display(), e),
        })?;

        let headers = rdr.headers()?.clone();
        let label_idx = headers
            .iter()
            .position(|h| h.trim() == self.label_column)
            .ok_or_else(|| ClassifierError::Dataset {
                message: format!(
                    "Dataset {} has no '{}' column",
                    self.path.display(),
                    self.label_column
                ),
            })?;
        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != label_idx)
            .map(|(_, h)| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for (line, result) in rdr.records().enumerate() {
            // header is line 1
            let line = line + 2;
            let parsed = result
                .map_err(ClassifierError::from)
                .and_then(|record| self.parse_row(&record, &headers, label_idx, line));
            match (parsed, policy) {
                (Ok(row), _) => rows.push(row),
                (Err(err), RowPolicy::SkipInvalid) => {
                    tracing::debug!("Skipping row: {}", err);
                    skipped += 1;
                }
                (Err(err), RowPolicy::Strict) => return Err(err),
            }
        }

        tracing::debug!(
            "Read {} rows x {} features from {} ({} skipped)",
            rows.len(),
            feature_names.len(),
            self.path.display(),
            skipped
        );

        Ok(RawTable {
            feature_names,
            rows,
        })
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        headers: &csv::StringRecord,
        label_idx: usize,
        line: usize,
    ) -> Result<(Diagnosis, Vec<f64>)> {
        let mut label = None;
        let mut values = Vec::with_capacity(headers.len().saturating_sub(1));
        for (idx, cell) in record.iter().enumerate() {
            let cell = cell.trim();
            if idx == label_idx {
                label = Some(parse_label(cell).ok_or_else(|| ClassifierError::Dataset {
                    message: format!(
                        "Line {}: '{}' must be 1 (benign) or 0 (malignant), got '{}'",
                        line, self.label_column, cell
                    ),
                })?);
            } else {
                let value = cell.parse::<f64>().map_err(|_| ClassifierError::Dataset {
                    message: format!(
                        "Line {}: column '{}' is not numeric: '{}'",
                        line,
                        headers.get(idx).unwrap_or("?"),
                        cell
                    ),
                })?;
                values.push(value);
            }
        }
        let label = label.ok_or_else(|| ClassifierError::Dataset {
            message: format!("Line {}: no '{}' value", line, self.label_column),
        })?;
        Ok((label, values))
    }
}

fn parse_label(cell: &str) -> Option<Diagnosis> {
    let value = cell.parse::<f64>().ok()?;
    if value.fract() != 0.0 {
        return None;
    }
    Diagnosis::from_indicator(value as i64)
}
