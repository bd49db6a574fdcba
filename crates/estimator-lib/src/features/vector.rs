//! The fixed-order feature vector consumed by the regression model

use serde::{Deserialize, Serialize};

/// Number of model input features
pub const FEATURE_COUNT: usize = 27;

/// Feature names in model input order. Shared by dataset generation,
/// training and inference; never reorder.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    // Project context
    "project_type",
    "repo_size_mb",
    "is_monorepo",
    // Branch/build context
    "branch_type",
    "build_type",
    "environment",
    // Git metrics
    "files_changed",
    "lines_added",
    "lines_deleted",
    "source_files_pct",
    "deps_file_changed",
    "dependency_count",
    "test_files_changed",
    // Pipeline configuration
    "stages_count",
    "has_build_stage",
    "has_unit_tests",
    "has_integration_tests",
    "has_e2e_tests",
    "has_deploy_stage",
    "has_docker_build",
    "uses_emulator",
    "parallel_stages",
    "has_artifact_publish",
    // Cache/build state
    "is_first_build",
    "cache_available",
    "is_clean_build",
    // Time context
    "time_of_day_hour",
];

/// Number of regression targets
pub const TARGET_COUNT: usize = 3;

/// Target columns in model output order
pub const TARGET_COLUMNS: [&str; TARGET_COUNT] = ["cpu_avg_pct", "memory_gb", "build_time_min"];

/// Model input row
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Engineered features of one build.
///
/// Field order matches [`FEATURE_COLUMNS`], so the serialized form is an
/// ordered map of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub project_type: i64,
    pub repo_size_mb: f64,
    pub is_monorepo: i64,
    pub branch_type: i64,
    pub build_type: i64,
    pub environment: i64,
    pub files_changed: i64,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub source_files_pct: f64,
    pub deps_file_changed: i64,
    pub dependency_count: i64,
    pub test_files_changed: i64,
    pub stages_count: i64,
    pub has_build_stage: i64,
    pub has_unit_tests: i64,
    pub has_integration_tests: i64,
    pub has_e2e_tests: i64,
    pub has_deploy_stage: i64,
    pub has_docker_build: i64,
    pub uses_emulator: i64,
    pub parallel_stages: i64,
    pub has_artifact_publish: i64,
    pub is_first_build: i64,
    pub cache_available: i64,
    pub is_clean_build: i64,
    pub time_of_day_hour: i64,
}

impl FeatureVector {
    /// Values in schema order
    pub fn to_array(&self) -> FeatureRow {
        [
            self.project_type as f64,
            self.repo_size_mb,
            self.is_monorepo as f64,
            self.branch_type as f64,
            self.build_type as f64,
            self.environment as f64,
            self.files_changed as f64,
            self.lines_added as f64,
            self.lines_deleted as f64,
            self.source_files_pct,
            self.deps_file_changed as f64,
            self.dependency_count as f64,
            self.test_files_changed as f64,
            self.stages_count as f64,
            self.has_build_stage as f64,
            self.has_unit_tests as f64,
            self.has_integration_tests as f64,
            self.has_e2e_tests as f64,
            self.has_deploy_stage as f64,
            self.has_docker_build as f64,
            self.uses_emulator as f64,
            self.parallel_stages as f64,
            self.has_artifact_publish as f64,
            self.is_first_build as f64,
            self.cache_available as f64,
            self.is_clean_build as f64,
            self.time_of_day_hour as f64,
        ]
    }

    /// `(name, value)` pairs in schema order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_COLUMNS.into_iter().zip(self.to_array())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.named().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// Assemble a model input row by name, substituting 0 for any feature the
/// lookup does not know.
pub fn row_from_lookup<F>(mut lookup: F) -> FeatureRow
where
    F: FnMut(&str) -> Option<f64>,
{
    let mut row = [0.0; FEATURE_COUNT];
    for (slot, name) in row.iter_mut().zip(FEATURE_COLUMNS) {
        *slot = lookup(name).unwrap_or(0.0);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BuildContext, FeatureEngineer, FixedClock};
    use std::collections::HashMap;

    #[test]
    fn test_columns_unique() {
        let mut names: Vec<_> = FEATURE_COLUMNS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_row_from_lookup_fills_missing_with_zero() {
        let known: HashMap<&str, f64> = [("stages_count", 4.0), ("time_of_day_hour", 13.0)]
            .into_iter()
            .collect();
        let row = row_from_lookup(|name| known.get(name).copied());
        assert_eq!(row[13], 4.0);
        assert_eq!(row[26], 13.0);
        assert_eq!(row.iter().filter(|v| **v == 0.0).count(), FEATURE_COUNT - 2);
    }

    #[test]
    fn test_serialized_field_order_matches_columns() {
        let engineer = FeatureEngineer::with_clock(FixedClock(9));
        let vector = engineer.engineer(&BuildContext::default());
        let json = serde_json::to_string(&vector).unwrap();
        let positions: Vec<usize> = FEATURE_COLUMNS
            .iter()
            .map(|name| json.find(&format!("\"{}\":", name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_get_by_name() {
        let engineer = FeatureEngineer::with_clock(FixedClock(9));
        let vector = engineer.engineer(&BuildContext::default());
        assert_eq!(vector.get("stages_count"), Some(3.0));
        assert_eq!(vector.get("time_of_day_hour"), Some(9.0));
        assert_eq!(vector.get("no_such_feature"), None);
    }
}
