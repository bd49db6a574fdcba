//! Feature engineering layer
//!
//! Maps loosely-typed build contexts onto the fixed-order feature vector
//! shared by dataset generation, training and inference.

mod context;
pub mod encoding;
mod engineer;
mod vector;

pub use context::BuildContext;
pub use encoding::BranchHint;
pub use engineer::{Clock, FeatureEngineer, FixedClock, SystemClock, DEFAULT_STAGES_COUNT};
pub use vector::{
    row_from_lookup, FeatureRow, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT, TARGET_COLUMNS,
    TARGET_COUNT,
};
