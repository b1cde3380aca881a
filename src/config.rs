use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure loaded from tumor_classifier.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5001)),
        }
    }
}

/// Model artifact location and training hyperparameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
    pub max_iterations: u64,
    /// L2 penalty passed to the logistic regression
    pub alpha: f64,
    /// Fraction of rows held out to measure accuracy after fitting
    pub holdout_ratio: f64,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("models/breast_cancer_model.msgpack"),
            max_iterations: 200,
            alpha: 1.0,
            holdout_ratio: 0.2,
            seed: 42,
        }
    }
}

/// Source CSV used for training and demo samples
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub label_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/breast_cancer.csv"),
            label_column: "diagnosis".to_string(),
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "tumor_classifier=info,tower_http=info";

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses `path` if given, then TUMOR_CLASSIFIER_CONFIG, then "tumor_classifier.toml".
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("TC_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
        }

        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("TUMOR_CLASSIFIER_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tumor_classifier.toml")),
        };

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply TC_* overrides (env-first). Unparsable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TC_HTTP_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => self.server.bind = bind,
                Err(_) => tracing::warn!("Ignoring unparsable TC_HTTP_BIND '{}'", v),
            }
        }
        if let Some(v) = lookup("TC_MODEL_PATH") {
            self.model.artifact_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TC_DATASET_PATH") {
            self.dataset.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TC_LABEL_COLUMN") {
            self.dataset.label_column = v;
        }
        if let Some(v) = lookup("TC_MAX_ITERATIONS") {
            match v.parse::<u64>() {
                Ok(n) => self.model.max_iterations = n,
                Err(_) => tracing::warn!("Ignoring unparsable TC_MAX_ITERATIONS '{}'", v),
            }
        }
        if let Some(v) = lookup("TC_HOLDOUT_RATIO") {
            match v.parse::<f64>() {
                Ok(r) => self.model.holdout_ratio = r,
                Err(_) => tracing::warn!("Ignoring unparsable TC_HOLDOUT_RATIO '{}'", v),
            }
        }
        if let Some(v) = lookup("TC_SEED") {
            match v.parse::<u64>() {
                Ok(s) => self.model.seed = s,
                Err(_) => tracing::warn!("Ignoring unparsable TC_SEED '{}'", v),
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..0.9).contains(&self.model.holdout_ratio) {
            anyhow::bail!("model.holdout_ratio must be in [0.0, 0.9)");
        }
        if self.model.max_iterations == 0 {
            anyhow::bail!("model.max_iterations must be at least 1");
        }
        if !(self.model.alpha >= 0.0 && self.model.alpha.is_finite()) {
            anyhow::bail!("model.alpha must be a finite value >= 0");
        }
        if self.dataset.label_column.trim().is_empty() {
            anyhow::bail!("dataset.label_column cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind.to_string(), "0.0.0.0:5001");
        assert_eq!(config.dataset.label_column, "diagnosis");
        assert_eq!(
            config.model.artifact_path,
            PathBuf::from("models/breast_cancer_model.msgpack")
        );
        assert_eq!(config.runtime.log_level, DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [model]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.model.seed, 7);
        assert_eq!(config.model.max_iterations, 200);
        assert_eq!(config.dataset.path, PathBuf::from("data/breast_cancer.csv"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TC_HTTP_BIND", "127.0.0.1:8088"),
            ("TC_DATASET_PATH", "/tmp/cases.csv"),
            ("TC_MAX_ITERATIONS", "not-a-number"),
            ("TC_HOLDOUT_RATIO", "0.3"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.bind.port(), 8088);
        assert_eq!(config.dataset.path, PathBuf::from("/tmp/cases.csv"));
        assert_eq!(config.model.max_iterations, 200);
        assert_eq!(config.model.holdout_ratio, 0.3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.model.holdout_ratio = 0.95;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.model.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dataset.label_column = " ".into();
        assert!(config.validate().is_err());
    }
}
