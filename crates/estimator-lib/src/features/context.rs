//! Normalization of loosely-typed build contexts
//!
//! Upstream analyzers send either camelCase (`projectType`) or snake_case
//! (`project_type`) keys. The adapter resolves each field once, camelCase
//! first, and coerces it to a typed optional value. Absent and `null`
//! fields stay `None`; present fields with an incompatible type are
//! rejected as `InputParse` rather than silently defaulted.

use super::encoding::BranchHint;
use crate::error::{EstimatorError, Result};
use serde_json::{Map, Value};

/// Build context with every field resolved and typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildContext {
    pub project_type: Option<String>,
    pub repo_size_mb: Option<f64>,
    pub is_monorepo: Option<i64>,
    pub branch: Option<String>,
    pub branch_type: Option<BranchHint>,
    pub build_type: Option<String>,
    pub environment: Option<String>,
    pub files_changed: Option<i64>,
    pub lines_added: Option<i64>,
    pub lines_deleted: Option<i64>,
    pub source_files_pct: Option<f64>,
    pub deps_file_changed: Option<i64>,
    pub dependency_count: Option<i64>,
    pub test_files_changed: Option<i64>,
    pub stages_count: Option<i64>,
    pub has_build_stage: Option<i64>,
    pub has_unit_tests: Option<i64>,
    pub has_integration_tests: Option<i64>,
    pub has_e2e_tests: Option<i64>,
    pub has_deploy_stage: Option<i64>,
    pub has_docker_build: Option<i64>,
    pub uses_emulator: Option<i64>,
    pub parallel_stages: Option<i64>,
    pub has_artifact_publish: Option<i64>,
    pub is_first_build: Option<i64>,
    pub cache_available: Option<i64>,
    pub is_clean_build: Option<i64>,
    pub time_of_day_hour: Option<i64>,
    /// Echo the engineered features back in the prediction payload
    pub debug: bool,
}

impl BuildContext {
    /// Parse a JSON document; the top level must be an object
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| EstimatorError::input(format!("Invalid input JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(EstimatorError::input(format!(
                "Invalid input JSON: expected an object, got {}",
                kind(other)
            ))),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let fields = Fields { map };
        Ok(Self {
            project_type: fields.string("projectType", "project_type")?,
            repo_size_mb: fields.float("repoSizeMb", "repo_size_mb")?,
            is_monorepo: fields.int("isMonorepo", "is_monorepo")?,
            branch: fields.string("branch", "branch")?,
            branch_type: fields.branch_hint("branchType", "branch_type"),
            build_type: fields.string("buildType", "build_type")?,
            environment: fields.string("environment", "environment")?,
            files_changed: fields.int("filesChanged", "files_changed")?,
            lines_added: fields.int("linesAdded", "lines_added")?,
            lines_deleted: fields.int("linesDeleted", "lines_deleted")?,
            source_files_pct: fields.float("sourceFilesPct", "source_files_pct")?,
            deps_file_changed: fields.int("depsChanged", "deps_file_changed")?,
            dependency_count: fields.int("dependencyCount", "dependency_count")?,
            test_files_changed: fields.int("testFilesChanged", "test_files_changed")?,
            stages_count: fields.int("stagesCount", "stages_count")?,
            has_build_stage: fields.int("hasBuildStage", "has_build_stage")?,
            has_unit_tests: fields.int("hasUnitTests", "has_unit_tests")?,
            has_integration_tests: fields.int("hasIntegrationTests", "has_integration_tests")?,
            has_e2e_tests: fields.int("hasE2ETests", "has_e2e_tests")?,
            has_deploy_stage: fields.int("hasDeployStage", "has_deploy_stage")?,
            has_docker_build: fields.int("hasDockerBuild", "has_docker_build")?,
            uses_emulator: fields.int("usesEmulator", "uses_emulator")?,
            parallel_stages: fields.int("parallelStages", "parallel_stages")?,
            has_artifact_publish: fields.int("hasArtifactPublish", "has_artifact_publish")?,
            is_first_build: fields.int("isFirstBuild", "is_first_build")?,
            cache_available: fields.int("cacheAvailable", "cache_available")?,
            is_clean_build: fields.int("isCleanBuild", "is_clean_build")?,
            time_of_day_hour: fields.int("timeOfDayHour", "time_of_day_hour")?,
            debug: map.get("debug").map(truthy).unwrap_or(false),
        })
    }
}

struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// camelCase key first, then snake_case; `null` counts as absent
    fn lookup(&self, camel: &'static str, snake: &'static str) -> Option<(&'static str, &'a Value)> {
        [camel, snake]
            .into_iter()
            .find_map(|key| match self.map.get(key) {
                Some(Value::Null) | None => None,
                Some(v) => Some((key, v)),
            })
    }

    fn int(&self, camel: &'static str, snake: &'static str) -> Result<Option<i64>> {
        self.lookup(camel, snake)
            .map(|(key, v)| coerce_int(key, v))
            .transpose()
    }

    fn float(&self, camel: &'static str, snake: &'static str) -> Result<Option<f64>> {
        self.lookup(camel, snake)
            .map(|(key, v)| coerce_float(key, v))
            .transpose()
    }

    fn string(&self, camel: &'static str, snake: &'static str) -> Result<Option<String>> {
        self.lookup(camel, snake)
            .map(|(key, v)| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(type_error(key, "string", other)),
            })
            .transpose()
    }

    /// Integers (and booleans) are explicit codes, non-empty strings are
    /// names; anything else leaves the branch type to be inferred.
    fn branch_hint(&self, camel: &'static str, snake: &'static str) -> Option<BranchHint> {
        match self.lookup(camel, snake)?.1 {
            Value::Bool(b) => Some(BranchHint::Code(i64::from(*b))),
            Value::Number(n) => n.as_i64().map(BranchHint::Code),
            Value::String(s) if !s.is_empty() => Some(BranchHint::Name(s.clone())),
            _ => None,
        }
    }
}

fn coerce_int(key: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                // truncate toward zero, like an integer cast
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(type_error(key, "integer", value)),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| type_error(key, "integer", value)),
        other => Err(type_error(key, "integer", other)),
    }
}

fn coerce_float(key: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(type_error(key, "number", value)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn type_error(key: &str, expected: &str, value: &Value) -> EstimatorError {
    EstimatorError::input(format!(
        "field '{}' expected {}, got {} ({})",
        key,
        expected,
        kind(value),
        value
    ))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
