//! Prediction binary configuration

use anyhow::{Context, Result};
use estimator_lib::predictor::{
    OutputConfig, MAX_CPU_PCT, MIN_CPU_PCT, MIN_MEMORY_GB, MIN_TIME_MIN,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Settings that command-line flags may override
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    /// Model artifact used when `--model` is not given
    pub model_path: PathBuf,

    /// Prometheus textfile written on exit
    pub metrics_file: Option<PathBuf>,

    /// Clamp bounds for the printed prediction
    pub min_cpu_pct: f64,
    pub max_cpu_pct: f64,
    pub min_memory_gb: f64,
    pub min_time_min: f64,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            metrics_file: None,
            min_cpu_pct: MIN_CPU_PCT,
            max_cpu_pct: MAX_CPU_PCT,
            min_memory_gb: MIN_MEMORY_GB,
            min_time_min: MIN_TIME_MIN,
        }
    }
}

impl PredictConfig {
    /// Load configuration from `CIRE_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("CIRE"))
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read CIRE_* environment")?;

        let config: Self = config
            .try_deserialize()
            .context("Invalid CIRE_* configuration")?;
        if config.min_cpu_pct > config.max_cpu_pct {
            anyhow::bail!(
                "min_cpu_pct {} exceeds max_cpu_pct {}",
                config.min_cpu_pct,
                config.max_cpu_pct
            );
        }
        Ok(config)
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            min_cpu_pct: self.min_cpu_pct,
            max_cpu_pct: self.max_cpu_pct,
            min_memory_gb: self.min_memory_gb,
            min_time_min: self.min_time_min,
        }
    }
}
