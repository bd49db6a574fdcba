//! Stable integer encodings for categorical build-context fields
//!
//! Every encoder is total: unknown or unmatched input maps to code 0
//! (or the documented fallback) instead of failing.

use crate::models::{BranchType, BuildType, Environment, ProjectType};

/// Alias table for project type names, matched case-insensitively
const PROJECT_ALIASES: &[(&str, ProjectType)] = &[
    ("python", ProjectType::Python),
    ("java", ProjectType::Java),
    ("nodejs", ProjectType::Nodejs),
    ("node", ProjectType::Nodejs),
    ("react-native", ProjectType::ReactNative),
    ("reactnative", ProjectType::ReactNative),
    ("android", ProjectType::Android),
    ("ios", ProjectType::Ios),
    ("unknown", ProjectType::Python),
];

/// Names accepted for an explicit branch type string
const BRANCH_ALIASES: &[(&str, BranchType)] = &[
    ("feature", BranchType::Feature),
    ("develop", BranchType::Develop),
    ("development", BranchType::Develop),
    ("main", BranchType::Main),
    ("master", BranchType::Main),
    ("hotfix", BranchType::Hotfix),
    ("release", BranchType::Release),
];

/// Branch name assumed when a context carries none
pub const DEFAULT_BRANCH: &str = "develop";

/// Explicit branch classification supplied by an upstream caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchHint {
    /// Already-classified integer code, used verbatim
    Code(i64),
    /// Branch type name such as "hotfix"
    Name(String),
}

/// Resolve a project type name; unmatched names fall back to python
pub fn project_type(name: &str) -> ProjectType {
    let lowered = name.to_lowercase();
    PROJECT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, p)| *p)
        .unwrap_or(ProjectType::Python)
}

pub fn encode_project_type(name: &str) -> i64 {
    project_type(name).code()
}

/// Encode the branch type.
///
/// Priority: an explicit integer code, then an explicit name (0 when
/// unmatched), then inference from the raw branch name.
pub fn encode_branch_type(hint: Option<&BranchHint>, branch_name: &str) -> i64 {
    match hint {
        Some(BranchHint::Code(code)) => *code,
        Some(BranchHint::Name(name)) if !name.is_empty() => {
            let lowered = name.to_lowercase();
            BRANCH_ALIASES
                .iter()
                .find(|(alias, _)| *alias == lowered)
                .map(|(_, b)| b.code())
                .unwrap_or(0)
        }
        _ => infer_branch_type(branch_name).code(),
    }
}

/// Classify a raw branch name. Rules are checked in order; the first hit wins.
pub fn infer_branch_type(branch_name: &str) -> BranchType {
    let branch = branch_name.to_lowercase();
    if branch.contains("feature") {
        BranchType::Feature
    } else if branch == "develop" || branch == "development" {
        BranchType::Develop
    } else if branch == "main" || branch == "master" {
        BranchType::Main
    } else if branch.contains("hotfix") {
        BranchType::Hotfix
    } else if branch.contains("release") {
        BranchType::Release
    } else {
        BranchType::Feature
    }
}

pub fn build_type(name: &str) -> BuildType {
    match name.to_lowercase().as_str() {
        "release" | "prodrelease" => BuildType::Release,
        _ => BuildType::Debug,
    }
}

pub fn encode_build_type(name: &str) -> i64 {
    build_type(name).code()
}

/// Anything that is not a known dev or staging name counts as production
pub fn environment(name: &str) -> Environment {
    match name.to_lowercase().as_str() {
        "dev" | "development" => Environment::Development,
        "staging" => Environment::Staging,
        _ => Environment::Production,
    }
}

pub fn encode_environment(name: &str) -> i64 {
    environment(name).code()
}
