//! Descriptive statistics of a generated dataset

use super::record::SyntheticRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Min, max and mean of one target column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl TargetStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut stats = TargetStats {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
        };
        for v in values {
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
            stats.mean += v;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        stats.mean /= count as f64;
        Some(stats)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub project_types: BTreeMap<String, usize>,
    pub build_types: BTreeMap<String, usize>,
    pub statuses: BTreeMap<String, usize>,
    pub cpu_avg_pct: Option<TargetStats>,
    pub memory_gb: Option<TargetStats>,
    pub build_time_min: Option<TargetStats>,
    pub cache_hit_rate: f64,
    pub e2e_rate: f64,
    pub emulator_rate: f64,
    pub clean_build_rate: f64,
    pub monorepo_rate: f64,
    pub artifact_publish_rate: f64,
    pub mean_test_files_changed: f64,
    /// Share of builds started between 09:00 and 17:59
    pub working_hours_share: f64,
}

impl DatasetSummary {
    pub fn from_records(records: &[SyntheticRecord]) -> Self {
        let total = records.len();
        let rate = |f: fn(&SyntheticRecord) -> bool| {
            if total == 0 {
                0.0
            } else {
                records.iter().filter(|r| f(r)).count() as f64 / total as f64
            }
        };

        let mut project_types = BTreeMap::new();
        let mut build_types = BTreeMap::new();
        let mut statuses = BTreeMap::new();
        for r in records {
            *project_types.entry(r.project_type_name.clone()).or_insert(0) += 1;
            let build = if r.build_type == 1 { "release" } else { "debug" };
            *build_types.entry(build.to_string()).or_insert(0) += 1;
            *statuses.entry(r.status.clone()).or_insert(0) += 1;
        }

        let mean_test_files_changed = if total == 0 {
            0.0
        } else {
            records.iter().map(|r| r.test_files_changed as f64).sum::<f64>() / total as f64
        };

        Self {
            total,
            project_types,
            build_types,
            statuses,
            cpu_avg_pct: TargetStats::from_values(records.iter().map(|r| r.cpu_avg_pct)),
            memory_gb: TargetStats::from_values(records.iter().map(|r| r.memory_gb)),
            build_time_min: TargetStats::from_values(records.iter().map(|r| r.build_time_min)),
            cache_hit_rate: rate(|r| r.cache_available == 1),
            e2e_rate: rate(|r| r.has_e2e_tests == 1),
            emulator_rate: rate(|r| r.uses_emulator == 1),
            clean_build_rate: rate(|r| r.is_clean_build == 1),
            monorepo_rate: rate(|r| r.is_monorepo == 1),
            artifact_publish_rate: rate(|r| r.has_artifact_publish == 1),
            mean_test_files_changed,
            working_hours_share: rate(|r| (9..=17).contains(&r.time_of_day_hour)),
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            cache_hit_rate = self.cache_hit_rate,
            e2e_rate = self.e2e_rate,
            emulator_rate = self.emulator_rate,
            clean_build_rate = self.clean_build_rate,
            monorepo_rate = self.monorepo_rate,
            artifact_publish_rate = self.artifact_publish_rate,
            working_hours_share = self.working_hours_share,
            "Dataset summary"
        );
        for (name, count) in &self.project_types {
            info!(project_type = %name, count, "Project type distribution");
        }
    }
}
