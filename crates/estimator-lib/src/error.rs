//! Error types shared by every estimator component

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by feature engineering, training and prediction
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Malformed JSON/CSV input, or a field whose value cannot be coerced
    #[error("Invalid input: {0}")]
    InputParse(String),

    #[error("Model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Required feature or target columns are absent
    #[error("Missing columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Not enough data to train: {rows} records (need {required}+)")]
    InsufficientData { rows: usize, required: usize },

    /// Model artifact could not be loaded or evaluated
    #[error("Model error: {0}")]
    Model(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EstimatorError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::InputParse(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
