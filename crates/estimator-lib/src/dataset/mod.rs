//! Synthetic dataset generation
//!
//! Produces labelled build records from weighted sampling tables and the
//! resource profile engine, and writes them as CSV for training.

mod generator;
mod record;
mod summary;
pub mod tables;
mod writer;

pub use generator::{
    branch_name, git_metrics, DatasetGenerator, GeneratorConfig, GitMetrics, StatusDistribution,
    DEFAULT_RECORDS, DEFAULT_SEED,
};
pub use record::SyntheticRecord;
pub use summary::{DatasetSummary, TargetStats};
pub use writer::{
    write_dataset, write_records, write_training_projection, DatasetFiles, DATASET_FILE,
    TRAINING_FILE,
};
