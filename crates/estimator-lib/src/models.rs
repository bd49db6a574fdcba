//! Core data models for the resource estimator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Project type of the repository being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Python,
    Java,
    Nodejs,
    ReactNative,
    Android,
    Ios,
}

impl ProjectType {
    pub const ALL: [ProjectType; 6] = [
        ProjectType::Python,
        ProjectType::Java,
        ProjectType::Nodejs,
        ProjectType::ReactNative,
        ProjectType::Android,
        ProjectType::Ios,
    ];

    /// Integer encoding used in the feature vector
    pub fn code(self) -> i64 {
        match self {
            ProjectType::Python => 0,
            ProjectType::Java => 1,
            ProjectType::Nodejs => 2,
            ProjectType::ReactNative => 3,
            ProjectType::Android => 4,
            ProjectType::Ios => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectType::Python => "python",
            ProjectType::Java => "java",
            ProjectType::Nodejs => "nodejs",
            ProjectType::ReactNative => "react-native",
            ProjectType::Android => "android",
            ProjectType::Ios => "ios",
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Branch classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    Feature,
    Develop,
    Main,
    Hotfix,
    Release,
}

impl BranchType {
    pub const ALL: [BranchType; 5] = [
        BranchType::Feature,
        BranchType::Develop,
        BranchType::Main,
        BranchType::Hotfix,
        BranchType::Release,
    ];

    pub fn code(self) -> i64 {
        match self {
            BranchType::Feature => 0,
            BranchType::Develop => 1,
            BranchType::Main => 2,
            BranchType::Hotfix => 3,
            BranchType::Release => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BranchType::Feature => "feature",
            BranchType::Develop => "develop",
            BranchType::Main => "main",
            BranchType::Hotfix => "hotfix",
            BranchType::Release => "release",
        }
    }
}

/// Deployment environment of the pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn code(self) -> i64 {
        match self {
            Environment::Development => 0,
            Environment::Staging => 1,
            Environment::Production => 2,
        }
    }
}

/// Build flavour: debug (0) or release (1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    Release,
}

impl BuildType {
    pub fn code(self) -> i64 {
        match self {
            BuildType::Debug => 0,
            BuildType::Release => 1,
        }
    }
}

/// Which pipeline stages exist for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub has_build_stage: bool,
    pub has_unit_tests: bool,
    pub has_integration_tests: bool,
    pub has_e2e_tests: bool,
    pub has_deploy_stage: bool,
    pub has_docker_build: bool,
    pub uses_emulator: bool,
    pub parallel_stages: u32,
}

impl PipelineConfig {
    /// A pipeline that only builds
    pub fn build_only() -> Self {
        Self {
            has_build_stage: true,
            has_unit_tests: false,
            has_integration_tests: false,
            has_e2e_tests: false,
            has_deploy_stage: false,
            has_docker_build: false,
            uses_emulator: false,
            parallel_stages: 1,
        }
    }

    /// Count of sequential stages (build, unit, integration, e2e, deploy)
    pub fn stages_count(&self) -> u32 {
        [
            self.has_build_stage,
            self.has_unit_tests,
            self.has_integration_tests,
            self.has_e2e_tests,
            self.has_deploy_stage,
        ]
        .iter()
        .filter(|s| **s)
        .count() as u32
    }

    pub fn has_tests(&self) -> bool {
        self.has_unit_tests || self.has_integration_tests
    }
}

/// Cache and workspace state at the start of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildState {
    pub cache_available: bool,
    pub is_first_build: bool,
    pub is_clean_build: bool,
    pub is_monorepo: bool,
}

impl BuildState {
    /// Warm incremental build with cache hits
    pub fn warm() -> Self {
        Self {
            cache_available: true,
            ..Self::default()
        }
    }
}

/// Simulated resource usage of one build
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub cpu_pct: f64,
    pub memory_gb: f64,
    pub time_min: f64,
}

/// Coarse trust signal attached to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_codes_round_trip() {
        for (i, p) in ProjectType::ALL.iter().enumerate() {
            assert_eq!(p.code(), i as i64);
            assert_eq!(ProjectType::from_code(i as i64), Some(*p));
        }
        assert_eq!(ProjectType::from_code(6), None);
    }

    #[test]
    fn test_stages_count() {
        let mut config = PipelineConfig::build_only();
        assert_eq!(config.stages_count(), 1);
        config.has_unit_tests = true;
        config.has_deploy_stage = true;
        // docker and emulator are not sequential stages
        config.has_docker_build = true;
        config.uses_emulator = true;
        assert_eq!(config.stages_count(), 3);
    }
}
