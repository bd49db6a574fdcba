//! Feature engineering for ML inference
//!
//! Turns a normalized [`BuildContext`] into the fixed 27-value
//! [`FeatureVector`]. Every field has a documented default, so engineering
//! never fails once the context has been parsed.

use super::context::BuildContext;
use super::encoding::{self, DEFAULT_BRANCH};
use super::vector::FeatureVector;
use crate::error::Result;
use chrono::Timelike;
use serde_json::Value;

pub const DEFAULT_REPO_SIZE_MB: f64 = 100.0;
pub const DEFAULT_FILES_CHANGED: i64 = 5;
pub const DEFAULT_LINES_ADDED: i64 = 100;
pub const DEFAULT_LINES_DELETED: i64 = 20;
pub const DEFAULT_SOURCE_FILES_PCT: f64 = 0.8;
pub const DEFAULT_DEPENDENCY_COUNT: i64 = 50;
pub const DEFAULT_STAGES_COUNT: i64 = 3;
const DEFAULT_BUILD_TYPE: &str = "debug";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Source of the current hour for `time_of_day_hour`
pub trait Clock: Send + Sync {
    fn current_hour(&self) -> u32;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Clock pinned to one hour of the day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn current_hour(&self) -> u32 {
        self.0
    }
}

/// Builds feature vectors from build contexts
pub struct FeatureEngineer<C: Clock = SystemClock> {
    clock: C,
}

impl FeatureEngineer<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl Default for FeatureEngineer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FeatureEngineer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Parse a raw JSON context and engineer its features
    pub fn engineer_value(&self, raw: &Value) -> Result<FeatureVector> {
        let context = BuildContext::from_value(raw)?;
        Ok(self.engineer(&context))
    }

    pub fn engineer(&self, ctx: &BuildContext) -> FeatureVector {
        let project_type = ctx
            .project_type
            .as_deref()
            .map(encoding::encode_project_type)
            .unwrap_or(0);
        let branch = ctx.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
        let time_of_day_hour = ctx
            .time_of_day_hour
            .unwrap_or_else(|| i64::from(self.clock.current_hour()));

        FeatureVector {
            project_type,
            repo_size_mb: ctx.repo_size_mb.unwrap_or(DEFAULT_REPO_SIZE_MB),
            is_monorepo: ctx.is_monorepo.unwrap_or(0),
            branch_type: encoding::encode_branch_type(ctx.branch_type.as_ref(), branch),
            build_type: encoding::encode_build_type(
                ctx.build_type.as_deref().unwrap_or(DEFAULT_BUILD_TYPE),
            ),
            environment: encoding::encode_environment(
                ctx.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT),
            ),
            files_changed: ctx.files_changed.unwrap_or(DEFAULT_FILES_CHANGED),
            lines_added: ctx.lines_added.unwrap_or(DEFAULT_LINES_ADDED),
            lines_deleted: ctx.lines_deleted.unwrap_or(DEFAULT_LINES_DELETED),
            source_files_pct: ctx.source_files_pct.unwrap_or(DEFAULT_SOURCE_FILES_PCT),
            deps_file_changed: ctx.deps_file_changed.unwrap_or(0),
            dependency_count: ctx.dependency_count.unwrap_or(DEFAULT_DEPENDENCY_COUNT),
            test_files_changed: ctx.test_files_changed.unwrap_or(0),
            stages_count: ctx.stages_count.unwrap_or(DEFAULT_STAGES_COUNT),
            has_build_stage: ctx.has_build_stage.unwrap_or(1),
            has_unit_tests: ctx.has_unit_tests.unwrap_or(1),
            has_integration_tests: ctx.has_integration_tests.unwrap_or(0),
            has_e2e_tests: ctx.has_e2e_tests.unwrap_or(0),
            has_deploy_stage: ctx.has_deploy_stage.unwrap_or(0),
            has_docker_build: ctx.has_docker_build.unwrap_or(0),
            uses_emulator: ctx.uses_emulator.unwrap_or(0),
            parallel_stages: ctx.parallel_stages.unwrap_or(0),
            has_artifact_publish: ctx.has_artifact_publish.unwrap_or(0),
            is_first_build: ctx.is_first_build.unwrap_or(0),
            cache_available: ctx.cache_available.unwrap_or(1),
            is_clean_build: ctx.is_clean_build.unwrap_or(0),
            time_of_day_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use serde_json::json;

    fn engineer(raw: Value) -> FeatureVector {
        FeatureEngineer::with_clock(FixedClock(14))
            .engineer_value(&raw)
            .unwrap()
    }

    #[test]
    fn test_empty_context_defaults() {
        let f = engineer(json!({}));
        assert_eq!(f.project_type, 0);
        assert_eq!(f.repo_size_mb, 100.0);
        assert_eq!(f.is_monorepo, 0);
        // default branch "develop"
        assert_eq!(f.branch_type, 1);
        assert_eq!(f.build_type, 0);
        assert_eq!(f.environment, 0);
        assert_eq!(f.files_changed, 5);
        assert_eq!(f.lines_added, 100);
        assert_eq!(f.lines_deleted, 20);
        assert_eq!(f.source_files_pct, 0.8);
        assert_eq!(f.deps_file_changed, 0);
        assert_eq!(f.dependency_count, 50);
        assert_eq!(f.test_files_changed, 0);
        assert_eq!(f.stages_count, 3);
        assert_eq!(f.has_build_stage, 1);
        assert_eq!(f.has_unit_tests, 1);
        assert_eq!(f.has_integration_tests, 0);
        assert_eq!(f.has_e2e_tests, 0);
        assert_eq!(f.has_deploy_stage, 0);
        assert_eq!(f.has_docker_build, 0);
        assert_eq!(f.uses_emulator, 0);
        assert_eq!(f.parallel_stages, 0);
        assert_eq!(f.has_artifact_publish, 0);
        assert_eq!(f.is_first_build, 0);
        assert_eq!(f.cache_available, 1);
        assert_eq!(f.is_clean_build, 0);
        assert_eq!(f.time_of_day_hour, 14);
    }

    #[test]
    fn test_all_values_finite() {
        let f = engineer(json!({}));
        let row = f.to_array();
        assert_eq!(row.len(), FEATURE_COUNT);
        assert!(row.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_android_release_context() {
        let f = engineer(json!({
            "projectType": "android",
            "branch": "release/v2.1.0",
            "buildType": "release",
            "hasE2ETests": true,
            "usesEmulator": true
        }));
        assert_eq!(f.project_type, 4);
        assert_eq!(f.branch_type, 4);
        assert_eq!(f.build_type, 1);
        assert_eq!(f.has_e2e_tests, 1);
        assert_eq!(f.uses_emulator, 1);

        let defaults = engineer(json!({}));
        assert_eq!(f.files_changed, defaults.files_changed);
        assert_eq!(f.stages_count, defaults.stages_count);
        assert_eq!(f.cache_available, defaults.cache_available);
        assert_eq!(f.environment, defaults.environment);
    }

    #[test]
    fn test_basic_and_full_contexts_agree() {
        let camel = engineer(json!({
            "projectType": "java",
            "filesChanged": 12,
            "isFirstBuild": 1,
            "timeOfDayHour": 3
        }));
        let snake = engineer(json!({
            "project_type": "java",
            "files_changed": 12,
            "is_first_build": 1,
            "time_of_day_hour": 3
        }));
        assert_eq!(camel, snake);
        assert_eq!(camel.time_of_day_hour, 3);
    }

    #[test]
    fn test_explicit_branch_type_overrides_name() {
        let f = engineer(json!({"branch": "release/v1", "branchType": 2}));
        assert_eq!(f.branch_type, 2);
        let f = engineer(json!({"branch": "release/v1", "branchType": "hotfix"}));
        assert_eq!(f.branch_type, 3);
    }

    #[test]
    fn test_environment_mapping() {
        assert_eq!(engineer(json!({"environment": "staging"})).environment, 1);
        assert_eq!(engineer(json!({"environment": "production"})).environment, 2);
        assert_eq!(engineer(json!({"environment": "dev"})).environment, 0);
    }

    #[test]
    fn test_incompatible_field_fails() {
        let engineer = FeatureEngineer::with_clock(FixedClock(0));
        assert!(engineer.engineer_value(&json!({"stagesCount": {"a": 1}})).is_err());
    }

    #[test]
    fn test_system_clock_hour_in_range() {
        let f = FeatureEngineer::new().engineer(&BuildContext::default());
        assert!((0..24).contains(&f.time_of_day_hour));
    }
}
