//! Configuration management for the CLI
//!
//! Layers built-in defaults, an optional JSON file and `CIRE_*`
//! environment variables. Command-line flags override the result.

use anyhow::{Context, Result};
use estimator_lib::dataset::{GeneratorConfig, StatusDistribution};
use estimator_lib::model::ForestParams;
use estimator_lib::trainer::TrainerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed for dataset generation, the train/test split and the forest
    pub seed: u64,
    /// Records per generated dataset
    pub records: usize,
    /// Default output directory for `generate`
    pub output_dir: PathBuf,
    /// Default model directory for `train`
    pub model_dir: PathBuf,
    /// Build status weights, `name=weight` pairs
    pub status_weights: Option<String>,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features per split; unset means sqrt of the feature count
    pub max_features: Option<usize>,
    pub min_rows: usize,
    pub test_fraction: f64,
    pub cv_folds: usize,
}

impl Default for Config {
    fn default() -> Self {
        let forest = ForestParams::default();
        let trainer = TrainerConfig::default();
        Self {
            seed: 42,
            records: 1000,
            output_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("models"),
            status_weights: None,
            n_estimators: forest.n_estimators,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
            min_samples_leaf: forest.min_samples_leaf,
            max_features: forest.max_features,
            min_rows: trainer.min_rows,
            test_fraction: trainer.test_fraction,
            cv_folds: trainer.cv_folds,
        }
    }
}

impl Config {
    /// Load configuration, reading `file` or the default config path
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let path = match file {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(file.is_some()))
            .add_source(config::Environment::with_prefix("CIRE").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("cire").join("config.json"))
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            records: self.records,
            seed: self.seed,
            ..GeneratorConfig::default()
        }
    }

    pub fn status_distribution(&self) -> Result<StatusDistribution> {
        match self.status_weights.as_deref() {
            Some(weights) => StatusDistribution::parse(weights).context("Invalid status weights"),
            None => Ok(StatusDistribution::default()),
        }
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            forest: ForestParams {
                n_estimators: self.n_estimators,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                min_samples_leaf: self.min_samples_leaf,
                max_features: self.max_features,
                seed: self.seed,
            },
            min_rows: self.min_rows,
            test_fraction: self.test_fraction,
            cv_folds: self.cv_folds,
            ..TrainerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_library() {
        let config = Config::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.records, 1000);
        let trainer = config.trainer_config();
        assert_eq!(trainer.forest.n_estimators, 150);
        assert_eq!(trainer.forest.max_depth, 15);
        assert_eq!(trainer.min_rows, 50);
        assert_eq!(trainer.cv_folds, 5);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"seed": 7, "n_estimators": 20, "status_weights": "success=1"}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.n_estimators, 20);
        assert_eq!(config.records, 1000);
        assert_eq!(config.trainer_config().forest.seed, 7);
        assert!(config.status_distribution().is_ok());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_invalid_status_weights() {
        let config = Config {
            status_weights: Some("success".to_string()),
            ..Config::default()
        };
        assert!(config.status_distribution().is_err());
    }
}
