//! Model training
//!
//! Loads a training CSV, fits the random forest on a seeded 80/20 split,
//! evaluates it and writes the model plus its `features.json` sidecar.

mod data;
mod metrics;

pub use data::TrainingData;
pub use metrics::{
    column, evaluate, kfold_ranges, mean_absolute_error, r2_score, Evaluation, TargetMetrics,
};

use crate::error::{EstimatorError, Result};
use crate::features::FEATURE_COLUMNS;
use crate::model::{ArtifactMetrics, ForestParams, ModelSidecar, RandomForest, MODEL_FILE};
use crate::observability::{EstimatorMetrics, StructuredLogger};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Index of `build_time_min` in the target order
const BUILD_TIME_TARGET: usize = 2;

/// Number of importances reported
const TOP_FEATURES: usize = 10;

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub forest: ForestParams,
    /// Fewer rows than this is an error
    pub min_rows: usize,
    pub test_fraction: f64,
    pub cv_folds: usize,
    /// R2 below this logs a warning
    pub r2_warning_threshold: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            min_rows: 50,
            test_fraction: 0.2,
            cv_folds: 5,
            r2_warning_threshold: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: &'static str,
    pub importance: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub evaluation: Evaluation,
    /// Per-fold R2 of `build_time_min`
    pub cv_scores: Vec<f64>,
    pub cv_mean: f64,
    pub top_features: Vec<FeatureImportance>,
    pub duration_secs: f64,
}

impl TrainingReport {
    pub fn artifact_metrics(&self) -> ArtifactMetrics {
        ArtifactMetrics {
            r2_score: self.evaluation.r2_score,
            mae: self.evaluation.mae,
            cv_mean: self.cv_mean,
        }
    }
}

/// Files written by [`ModelTrainer::save`]
#[derive(Debug, Clone)]
pub struct SavedModel {
    pub model_path: PathBuf,
    pub sidecar_path: PathBuf,
}

pub struct ModelTrainer {
    config: TrainerConfig,
    metrics: Option<EstimatorMetrics>,
    logger: Option<StructuredLogger>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            metrics: None,
            logger: None,
        }
    }

    pub fn with_metrics(mut self, metrics: EstimatorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit and evaluate a forest
    pub fn train(&self, data: &TrainingData) -> Result<(RandomForest, TrainingReport)> {
        let start = Instant::now();
        if data.len() < self.config.min_rows {
            return Err(EstimatorError::InsufficientData {
                rows: data.len(),
                required: self.config.min_rows,
            });
        }

        let (train, test) = self.split(data);
        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            n_estimators = self.config.forest.n_estimators,
            "Training random forest"
        );

        let forest = RandomForest::fit(&train.features, &train.targets, self.config.forest)?;
        let predictions: Vec<_> = test.features.iter().map(|r| forest.predict_row(r)).collect();
        let evaluation = evaluate(&test.targets, &predictions);

        for m in &evaluation.per_target {
            info!(column = m.target, r2 = m.r2, mae = m.mae, "Target metrics");
        }

        let top_features = top_importances(forest.feature_importances());
        for (rank, f) in top_features.iter().enumerate() {
            info!(
                rank = rank + 1,
                feature = f.feature,
                importance = f.importance,
                "Feature importance"
            );
        }

        let cv_scores = self.cross_validate(data)?;
        let cv_mean = if cv_scores.is_empty() {
            0.0
        } else {
            cv_scores.iter().sum::<f64>() / cv_scores.len() as f64
        };

        if evaluation.r2_score < self.config.r2_warning_threshold {
            warn!(
                r2_score = evaluation.r2_score,
                threshold = self.config.r2_warning_threshold,
                "Model R2 below target, consider more data or feature work"
            );
        }

        let report = TrainingReport {
            rows: data.len(),
            train_rows: train.len(),
            test_rows: test.len(),
            evaluation,
            cv_scores,
            cv_mean,
            top_features,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        if let Some(metrics) = &self.metrics {
            metrics.set_training_result(
                report.rows,
                report.evaluation.r2_score,
                report.duration_secs,
            );
        }
        if let Some(logger) = &self.logger {
            logger.log_model_trained(
                report.rows,
                report.evaluation.r2_score,
                report.evaluation.mae,
                report.cv_mean,
                report.duration_secs,
            );
        }
        Ok((forest, report))
    }

    /// Write `model.json` and `features.json` into `dir`
    pub fn save(
        &self,
        dir: &Path,
        forest: &RandomForest,
        report: &TrainingReport,
    ) -> Result<SavedModel> {
        std::fs::create_dir_all(dir)?;
        let bytes = forest.to_json_vec()?;
        let model_path = dir.join(MODEL_FILE);
        std::fs::write(&model_path, &bytes)?;

        let sidecar_path =
            ModelSidecar::new(report.artifact_metrics(), MODEL_FILE, &bytes).save(dir)?;
        info!(
            model = %model_path.display(),
            sidecar = %sidecar_path.display(),
            bytes = bytes.len(),
            "Model saved"
        );
        Ok(SavedModel {
            model_path,
            sidecar_path,
        })
    }

    /// Load `data_path`, train, and save into `model_dir`
    pub fn train_csv(
        &self,
        data_path: &Path,
        model_dir: &Path,
    ) -> Result<(TrainingReport, SavedModel)> {
        let data = TrainingData::from_path(data_path)?;
        let (forest, report) = self.train(&data)?;
        let saved = self.save(model_dir, &forest, &report)?;
        Ok((report, saved))
    }

    /// Seeded shuffle, test set first `ceil(n * test_fraction)` rows
    fn split(&self, data: &TrainingData) -> (TrainingData, TrainingData) {
        let mut indices: Vec<usize> = (0..data.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.forest.seed);
        indices.shuffle(&mut rng);

        let fraction = self.config.test_fraction.clamp(0.0, 1.0);
        let test_len = ((data.len() as f64 * fraction).ceil() as usize)
            .min(data.len().saturating_sub(1));
        let (test_idx, train_idx) = indices.split_at(test_len);
        (data.select(train_idx), data.select(test_idx))
    }

    /// Unshuffled k-fold R2 of `build_time_min`
    fn cross_validate(&self, data: &TrainingData) -> Result<Vec<f64>> {
        let folds = kfold_ranges(data.len(), self.config.cv_folds);
        if folds.len() < 2 {
            return Ok(Vec::new());
        }
        folds
            .iter()
            .map(|fold| {
                let train_idx: Vec<usize> =
                    (0..data.len()).filter(|i| !fold.contains(i)).collect();
                let test_idx: Vec<usize> = fold.clone().collect();
                let train = data.select(&train_idx);
                let test = data.select(&test_idx);
                let forest =
                    RandomForest::fit(&train.features, &train.targets, self.config.forest)?;
                let predicted: Vec<f64> = test
                    .features
                    .iter()
                    .map(|r| forest.predict_row(r)[BUILD_TIME_TARGET])
                    .collect();
                Ok(r2_score(&column(&test.targets, BUILD_TIME_TARGET), &predicted))
            })
            .collect()
    }
}

fn top_importances(importances: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .zip(importances)
        .map(|(&feature, &importance)| FeatureImportance {
            feature,
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(TOP_FEATURES);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{write_training_projection, DatasetGenerator, GeneratorConfig};
    use tempfile::TempDir;

    fn fast_config() -> TrainerConfig {
        TrainerConfig {
            forest: ForestParams {
                n_estimators: 10,
                max_depth: 8,
                ..ForestParams::default()
            },
            cv_folds: 3,
            ..TrainerConfig::default()
        }
    }

    fn generated(records: usize) -> TrainingData {
        let records = DatasetGenerator::new(GeneratorConfig {
            records,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate();
        let mut buf = Vec::new();
        write_training_projection(&mut buf, &records).unwrap();
        TrainingData::from_reader(buf.as_slice()).unwrap()
    }

    #[test]
    fn test_insufficient_data() {
        let trainer = ModelTrainer::new(fast_config());
        let data = generated(20);
        match trainer.train(&data) {
            Err(EstimatorError::InsufficientData { rows, required }) => {
                assert_eq!(rows, 20);
                assert_eq!(required, 50);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected InsufficientData"),
        }
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let trainer = ModelTrainer::new(fast_config());
        let data = generated(101);
        let (train, test) = trainer.split(&data);
        assert_eq!(test.len(), 21);
        assert_eq!(train.len(), 80);
        let (_, test_again) = trainer.split(&data);
        assert_eq!(test, test_again);
    }

    #[test]
    fn test_train_reports_metrics() {
        let trainer = ModelTrainer::new(fast_config());
        let data = generated(300);
        let (forest, report) = trainer.train(&data).unwrap();
        assert_eq!(forest.n_trees(), 10);
        assert_eq!(report.rows, 300);
        assert_eq!(report.train_rows + report.test_rows, 300);
        assert_eq!(report.cv_scores.len(), 3);
        assert_eq!(report.top_features.len(), 10);
        assert_eq!(report.evaluation.per_target.len(), 3);
        assert!(report.evaluation.r2_score.is_finite());
        // the labels are driven by project type and pipeline shape
        assert!(report.evaluation.r2_score > 0.2, "r2 {}", report.evaluation.r2_score);
    }

    #[test]
    fn test_train_csv_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let records = DatasetGenerator::new(GeneratorConfig {
            records: 120,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate();
        let csv_path = dir.path().join("training_features.csv");
        write_training_projection(std::fs::File::create(&csv_path).unwrap(), &records).unwrap();

        let metrics = EstimatorMetrics::new().unwrap();
        let trainer = ModelTrainer::new(fast_config()).with_metrics(metrics.clone());
        let model_dir = dir.path().join("models");
        let (report, saved) = trainer.train_csv(&csv_path, &model_dir).unwrap();

        assert!(saved.model_path.exists());
        let sidecar: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&saved.sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar["features"].as_array().unwrap().len(), 27);
        assert_eq!(sidecar["targets"][2], "build_time_min");
        assert_eq!(sidecar["metrics"]["cv_mean"], report.cv_mean);
        assert_eq!(sidecar["model_file"], "model.json");
        assert!(metrics.render().unwrap().contains("cire_training_rows 120"));

        let model = crate::model::load_model(&saved.model_path).unwrap();
        assert_eq!(model.kind(), "random_forest");
    }

    #[test]
    fn test_top_importances_sorted() {
        let mut importances = vec![0.0; 27];
        importances[13] = 0.5;
        importances[0] = 0.3;
        importances[26] = 0.2;
        let top = top_importances(&importances);
        assert_eq!(top[0].feature, "stages_count");
        assert_eq!(top[1].feature, "project_type");
        assert_eq!(top[2].feature, "time_of_day_hour");
    }
}
