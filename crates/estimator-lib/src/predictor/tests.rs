//! End-to-end tests: generate a dataset, train on it, predict from a context
//!
//! Everything runs against files in a temporary directory, the same way the
//! CLI and the prediction binary chain together.

#[cfg(test)]
mod pipeline_tests {
    use crate::dataset::{write_dataset, DatasetGenerator, GeneratorConfig};
    use crate::model::{load_model, ForestParams, ModelSidecar};
    use crate::predictor::{PredictionService, MIN_CPU_PCT, MIN_MEMORY_GB, MIN_TIME_MIN};
    use crate::trainer::{ModelTrainer, TrainerConfig};
    use crate::{Confidence, EstimatorError};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn small_trainer() -> ModelTrainer {
        ModelTrainer::new(TrainerConfig {
            forest: ForestParams {
                n_estimators: 10,
                max_depth: 8,
                ..ForestParams::default()
            },
            cv_folds: 3,
            ..TrainerConfig::default()
        })
    }

    /// Generate, write and train; returns the saved model path
    fn build_model(dir: &Path, records: usize) -> PathBuf {
        let records = DatasetGenerator::new(GeneratorConfig {
            records,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate();
        let files = write_dataset(&dir.join("data"), &records).unwrap();

        let (report, saved) = small_trainer()
            .train_csv(&files.training, &dir.join("models"))
            .unwrap();
        assert_eq!(report.rows, records.len());
        assert_eq!(report.cv_scores.len(), 3);
        saved.model_path
    }

    #[test]
    fn test_generate_train_predict() {
        let dir = TempDir::new().unwrap();
        let model_path = build_model(dir.path(), 300);

        let service = PredictionService::load(&model_path).unwrap();
        let payload = service
            .predict_json(r#"{"projectType": "java", "hasIntegrationTests": true}"#)
            .unwrap();

        assert!(payload.cpu >= MIN_CPU_PCT && payload.cpu <= 100.0);
        assert!(payload.memory_gb >= MIN_MEMORY_GB);
        assert!(payload.time_minutes >= MIN_TIME_MIN);
        assert_eq!(payload.features_used, 27);
        assert_eq!(payload.confidence, Confidence::Low);
    }

    #[test]
    fn test_heavier_context_predicts_more_time() {
        let dir = TempDir::new().unwrap();
        let model_path = build_model(dir.path(), 400);
        let service = PredictionService::load(&model_path).unwrap();

        let light = service
            .predict_json(r#"{"projectType": "python", "cacheAvailable": true}"#)
            .unwrap();
        let heavy = service
            .predict_json(
                r#"{"projectType": "android", "hasE2ETests": true, "usesEmulator": true,
                    "buildType": "release", "cacheAvailable": false, "isCleanBuild": true}"#,
            )
            .unwrap();
        assert!(
            heavy.time_minutes > light.time_minutes,
            "heavy {} should exceed light {}",
            heavy.time_minutes,
            light.time_minutes
        );
    }

    #[test]
    fn test_tampered_model_rejected() {
        let dir = TempDir::new().unwrap();
        let model_path = build_model(dir.path(), 120);
        assert!(ModelSidecar::load_for(&model_path).unwrap().is_some());

        let mut bytes = std::fs::read(&model_path).unwrap();
        bytes.push(b' ');
        std::fs::write(&model_path, bytes).unwrap();

        assert!(load_model(&model_path).is_err());
    }

    #[test]
    fn test_missing_model() {
        let dir = TempDir::new().unwrap();
        let result = PredictionService::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(EstimatorError::ModelNotFound(_))));
    }
}
