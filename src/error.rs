//! Domain-specific error types for tumor-classifier

use thiserror::Error;

/// Client input problems found while validating a submission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing: {0}")]
    Missing(String),

    #[error("Invalid numeric data: {0}")]
    Invalid(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,
}

impl ValidationError {
    /// Name of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::Missing(name) | ValidationError::Invalid(name) => Some(name),
            ValidationError::NotAnObject => None,
        }
    }
}

/// Main error type for the classifier service
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Dataset error: {message}")]
    Dataset { message: String },

    #[error("Model error: {message}")]
    Model { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for ClassifierError {
    fn from(err: anyhow::Error) -> Self {
        ClassifierError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for ClassifierError {
    fn from(err: csv::Error) -> Self {
        ClassifierError::Dataset {
            message: err.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for ClassifierError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        ClassifierError::Serialization {
            message: format!("Failed to encode model artifact: {}", err),
        }
    }
}

impl From<rmp_serde::decode::Error> for ClassifierError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        ClassifierError::Serialization {
            message: format!("Failed to decode model artifact: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for ClassifierError {
    fn from(err: tokio::task::JoinError) -> Self {
        ClassifierError::Internal {
            message: format!("Blocking task failed: {}", err),
        }
    }
}

/// Result type alias for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;
