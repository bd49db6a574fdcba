//! Sampling tables for synthetic build records

use crate::models::ProjectType;
use crate::profile::Interval;

/// Indexed like [`ProjectType::ALL`]
pub const PROJECT_TYPE_WEIGHTS: [f64; 6] = [0.25, 0.20, 0.20, 0.15, 0.12, 0.08];

/// Indexed like `BranchType::ALL`
pub const BRANCH_TYPE_WEIGHTS: [f64; 5] = [0.35, 0.20, 0.25, 0.10, 0.10];

/// dev, staging, production
pub const ENVIRONMENT_WEIGHTS: [f64; 3] = [0.50, 0.30, 0.20];

/// Builds per hour of day, peaking during working hours.
/// Not normalized; the weighted sampler handles that.
pub const HOUR_WEIGHTS: [f64; 24] = [
    0.01, 0.01, 0.01, 0.01, 0.02, 0.02, 0.03, 0.05, // 0-7
    0.08, 0.10, 0.10, 0.10, 0.08, 0.10, 0.10, 0.08, // 8-15
    0.05, 0.03, 0.02, 0.01, 0.01, 0.01, 0.01, 0.01, // 16-23
];

pub const BRANCH_SUFFIXES: [&str; 13] = [
    "auth", "login", "api", "ui", "db", "test", "fix", "perf", "mobile", "cache", "analytics",
    "search", "payment",
];

pub const HOTFIX_SUFFIXES: [&str; 4] = ["bug", "fix", "urgent", "patch"];

pub const RELEASE_PARALLEL_STAGES: [u32; 5] = [1, 1, 2, 2, 3];
pub const DEFAULT_PARALLEL_STAGES: [u32; 4] = [1, 1, 1, 2];

pub const RELEASE_STAGE_MULTIPLIER: f64 = 1.3;
pub const BUILD_TYPE_RELEASE_PROBABILITY: f64 = 0.15;
pub const DEPLOY_STAGE_PROBABILITY: f64 = 0.30;
pub const FIRST_BUILD_PROBABILITY: f64 = 0.08;
pub const CACHE_HIT_PROBABILITY: f64 = 0.85;
pub const SMALL_CHANGE_PROBABILITY: f64 = 0.35;
pub const DEPS_FILE_CHANGED_PROBABILITY: f64 = 0.20;

/// Repository size range in MB
pub fn repo_size_mb(project: ProjectType) -> Interval {
    match project {
        ProjectType::Python => Interval::new(10.0, 500.0),
        ProjectType::Java => Interval::new(50.0, 2000.0),
        ProjectType::Nodejs => Interval::new(10.0, 800.0),
        ProjectType::ReactNative => Interval::new(100.0, 3000.0),
        ProjectType::Android => Interval::new(100.0, 5000.0),
        ProjectType::Ios => Interval::new(100.0, 3000.0),
    }
}

/// Larger repositories are more often monorepos
pub fn monorepo_probability(repo_size_mb: f64) -> f64 {
    if repo_size_mb > 1000.0 {
        0.25
    } else if repo_size_mb > 500.0 {
        0.15
    } else {
        0.05
    }
}

pub fn clean_build_probability(is_release_build: bool) -> f64 {
    if is_release_build {
        0.25
    } else {
        0.08
    }
}

/// Typical change size of a project type
#[derive(Debug, Clone, Copy)]
pub struct GitProfile {
    pub files: (i64, i64),
    pub lines_added: (i64, i64),
    pub dependency_baseline: f64,
}

pub fn git_profile(project: ProjectType) -> GitProfile {
    let (files, lines_added, dependency_baseline) = match project {
        ProjectType::Python => ((1, 40), (5, 800), 50.0),
        ProjectType::Java => ((1, 60), (10, 1200), 80.0),
        ProjectType::Nodejs => ((1, 50), (5, 1000), 150.0),
        ProjectType::ReactNative => ((1, 80), (10, 1500), 200.0),
        ProjectType::Android => ((1, 100), (10, 2000), 100.0),
        ProjectType::Ios => ((1, 60), (10, 1200), 60.0),
    };
    GitProfile {
        files,
        lines_added,
        dependency_baseline,
    }
}

/// Small changes touch 1-5 files and 5-100 lines
pub const SMALL_CHANGE: GitProfile = GitProfile {
    files: (1, 5),
    lines_added: (5, 100),
    dependency_baseline: 0.0,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_cover_every_category() {
        assert_eq!(PROJECT_TYPE_WEIGHTS.len(), ProjectType::ALL.len());
        assert!((PROJECT_TYPE_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((BRANCH_TYPE_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((ENVIRONMENT_WEIGHTS.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_hour_weights_peak_in_working_hours() {
        let peak: f64 = HOUR_WEIGHTS[8..16].iter().sum();
        let night: f64 = HOUR_WEIGHTS[0..4].iter().chain(&HOUR_WEIGHTS[19..24]).sum();
        assert!(peak > 5.0 * night);
    }

    #[test]
    fn test_monorepo_probability_tiers() {
        assert_eq!(monorepo_probability(1500.0), 0.25);
        assert_eq!(monorepo_probability(700.0), 0.15);
        assert_eq!(monorepo_probability(1000.0), 0.15);
        assert_eq!(monorepo_probability(100.0), 0.05);
    }
}
