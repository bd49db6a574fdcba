//! Estimator library for CI/CD build resource prediction
//!
//! This crate provides the core functionality for:
//! - Feature engineering from loosely-typed build contexts
//! - Stochastic resource simulation from per-project profiles
//! - Synthetic training dataset generation
//! - Random forest training and ONNX/forest inference
//! - Observability (metrics and structured logging)

pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod profile;
pub mod trainer;

pub use error::{EstimatorError, Result};
pub use features::{BuildContext, FeatureEngineer, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
pub use models::*;
pub use observability::{EstimatorMetrics, StructuredLogger};
pub use predictor::{PredictionPayload, PredictionService};
pub use profile::{ResourceProfileEngine, PROFILE_TABLE};
pub use trainer::{ModelTrainer, TrainerConfig};
