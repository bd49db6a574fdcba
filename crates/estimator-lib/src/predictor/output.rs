//! Prediction output post-processing
//!
//! Clamps raw model outputs into a plausible range, rounds them for
//! presentation and scores confidence from the input features.

use crate::features::FeatureVector;
use crate::model::TargetRow;
use crate::models::Confidence;
use crate::profile::round_to;
use serde::{Deserialize, Serialize};

pub const MIN_CPU_PCT: f64 = 10.0;
pub const MAX_CPU_PCT: f64 = 100.0;
pub const MIN_MEMORY_GB: f64 = 0.5;
pub const MIN_TIME_MIN: f64 = 1.0;

/// Clamp bounds applied to every prediction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub min_cpu_pct: f64,
    pub max_cpu_pct: f64,
    pub min_memory_gb: f64,
    pub min_time_min: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_cpu_pct: MIN_CPU_PCT,
            max_cpu_pct: MAX_CPU_PCT,
            min_memory_gb: MIN_MEMORY_GB,
            min_time_min: MIN_TIME_MIN,
        }
    }
}

/// Clamped, rounded resource prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub cpu: f64,
    #[serde(rename = "memoryGb")]
    pub memory_gb: f64,
    #[serde(rename = "timeMinutes")]
    pub time_minutes: f64,
    pub confidence: Confidence,
}

/// Formats raw model outputs into a [`Prediction`]
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Format raw outputs `[cpu, memory, time]`.
    ///
    /// `f64::min`/`max` ignore NaN, so a NaN cpu takes the upper bound and
    /// NaN memory or time land on the floor.
    pub fn format(&self, raw: TargetRow, confidence: Confidence) -> Prediction {
        let cpu = raw[0].min(self.config.max_cpu_pct).max(self.config.min_cpu_pct);
        let memory_gb = raw[1].max(self.config.min_memory_gb);
        let time_minutes = raw[2].max(self.config.min_time_min);

        Prediction {
            cpu: round_to(cpu, 1),
            memory_gb: finite_or(round_to(memory_gb, 2), self.config.min_memory_gb),
            time_minutes: finite_or(round_to(time_minutes, 1), self.config.min_time_min),
            confidence,
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Score confidence from how many critical features differ from their
/// defaults: project type 0, no e2e tests, no emulator, 3 stages, not a
/// first build. Four or more is high, two or three medium, else low.
pub fn assess_confidence(features: &FeatureVector) -> Confidence {
    let differing = [
        features.project_type != 0,
        features.has_e2e_tests != 0,
        features.uses_emulator != 0,
        features.stages_count != 3,
        features.is_first_build != 0,
    ]
    .into_iter()
    .filter(|&d| d)
    .count();

    match differing {
        n if n >= 4 => Confidence::High,
        n if n >= 2 => Confidence::Medium,
        _ => Confidence::Low,
    }
}
