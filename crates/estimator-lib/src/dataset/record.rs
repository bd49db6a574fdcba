//! Synthetic build record written to the dataset CSV

use crate::features::{FeatureVector, TARGET_COUNT};
use serde::{Deserialize, Serialize};

/// One labelled synthetic build.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRecord {
    pub build_id: String,
    pub timestamp: String,
    pub pipeline_id: String,
    pub commit_id: String,
    // Project context
    pub project_type: i64,
    pub project_type_name: String,
    pub repo_size_mb: f64,
    pub is_monorepo: i64,
    // Branch context
    pub branch: String,
    pub branch_type: i64,
    pub build_type: i64,
    pub environment: i64,
    // Git metrics
    pub files_changed: i64,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub source_files_pct: f64,
    pub deps_file_changed: i64,
    pub dependency_count: i64,
    pub test_files_changed: i64,
    // Pipeline config
    pub has_build_stage: i64,
    pub has_unit_tests: i64,
    pub has_integration_tests: i64,
    pub has_e2e_tests: i64,
    pub has_deploy_stage: i64,
    pub has_docker_build: i64,
    pub uses_emulator: i64,
    pub parallel_stages: i64,
    pub stages_count: i64,
    pub has_artifact_publish: i64,
    // Cache/build state
    pub is_first_build: i64,
    pub cache_available: i64,
    pub is_clean_build: i64,
    // Time context
    pub time_of_day_hour: i64,
    // Targets
    pub memory_gb: f64,
    pub cpu_avg_pct: f64,
    pub build_time_min: f64,
    pub status: String,
}

impl SyntheticRecord {
    /// The 27 model features of this record
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            project_type: self.project_type,
            repo_size_mb: self.repo_size_mb,
            is_monorepo: self.is_monorepo,
            branch_type: self.branch_type,
            build_type: self.build_type,
            environment: self.environment,
            files_changed: self.files_changed,
            lines_added: self.lines_added,
            lines_deleted: self.lines_deleted,
            source_files_pct: self.source_files_pct,
            deps_file_changed: self.deps_file_changed,
            dependency_count: self.dependency_count,
            test_files_changed: self.test_files_changed,
            stages_count: self.stages_count,
            has_build_stage: self.has_build_stage,
            has_unit_tests: self.has_unit_tests,
            has_integration_tests: self.has_integration_tests,
            has_e2e_tests: self.has_e2e_tests,
            has_deploy_stage: self.has_deploy_stage,
            has_docker_build: self.has_docker_build,
            uses_emulator: self.uses_emulator,
            parallel_stages: self.parallel_stages,
            has_artifact_publish: self.has_artifact_publish,
            is_first_build: self.is_first_build,
            cache_available: self.cache_available,
            is_clean_build: self.is_clean_build,
            time_of_day_hour: self.time_of_day_hour,
        }
    }

    /// Targets in model output order (cpu, memory, time)
    pub fn targets(&self) -> [f64; TARGET_COUNT] {
        [self.cpu_avg_pct, self.memory_gb, self.build_time_min]
    }
}
