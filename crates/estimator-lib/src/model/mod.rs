//! Regression model abstraction
//!
//! A model maps 27-wide feature rows to (cpu, memory, time) triples. Two
//! backends exist: the in-crate random forest serialized as JSON, and
//! externally exported ONNX graphs run with tract.

mod artifact;
mod forest;
mod onnx;

pub use artifact::{sha256_hex, ArtifactMetrics, ModelSidecar, MODEL_FILE, SIDECAR_FILE};
pub use forest::{ForestParams, RandomForest, TargetRow};
pub use onnx::OnnxModel;

use crate::error::{EstimatorError, Result};
use crate::features::FeatureRow;
use std::path::Path;
use tracing::{debug, info};

/// Multi-output regressor over the fixed feature schema
pub trait RegressionModel {
    /// Predict one target row per input row, in (cpu, memory, time) order
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<TargetRow>>;

    /// Short backend name for logs
    fn kind(&self) -> &'static str;
}

/// Load a model artifact.
///
/// `.onnx` files run through tract, anything else is read as a serialized
/// forest. A `features.json` sidecar next to the artifact is verified first
/// when it names this file or names no file at all.
pub fn load_model(path: &Path) -> Result<Box<dyn RegressionModel>> {
    if !path.exists() {
        return Err(EstimatorError::ModelNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;

    if let Some(sidecar) = ModelSidecar::load_for(path)? {
        if sidecar.describes(path) {
            sidecar.verify(&bytes)?;
        } else {
            debug!(
                path = %path.display(),
                sidecar_model = ?sidecar.model_file,
                "Sidecar describes another artifact, skipping verification"
            );
        }
    }

    let is_onnx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("onnx"));

    let model: Box<dyn RegressionModel> = if is_onnx {
        Box::new(OnnxModel::from_bytes(&bytes)?)
    } else {
        Box::new(RandomForest::from_json_slice(&bytes)?)
    };

    info!(
        path = %path.display(),
        kind = model.kind(),
        bytes = bytes.len(),
        "Model loaded"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use tempfile::TempDir;

    fn tiny_forest() -> RandomForest {
        forest_with_trees(3)
    }

    fn forest_with_trees(n_estimators: usize) -> RandomForest {
        let x: Vec<FeatureRow> = (0..20)
            .map(|i| {
                let mut row = [0.0; FEATURE_COUNT];
                row[0] = i as f64;
                row
            })
            .collect();
        let y: Vec<TargetRow> = (0..20).map(|i| [i as f64 * 4.0, 2.0, 10.0]).collect();
        RandomForest::fit(
            &x,
            &y,
            ForestParams {
                n_estimators,
                ..ForestParams::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_missing_path_is_model_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        match load_model(&path) {
            Err(EstimatorError::ModelNotFound(p)) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_loads_forest_with_sidecar() {
        let dir = TempDir::new().unwrap();
        let bytes = tiny_forest().to_json_vec().unwrap();
        let path = dir.path().join(MODEL_FILE);
        std::fs::write(&path, &bytes).unwrap();
        let metrics = ArtifactMetrics {
            r2_score: 0.9,
            mae: 1.0,
            cv_mean: 0.9,
        };
        ModelSidecar::new(metrics, MODEL_FILE, &bytes)
            .save(dir.path())
            .unwrap();

        let model = load_model(&path).unwrap();
        assert_eq!(model.kind(), "random_forest");
        let out = model.predict(&[[0.0; FEATURE_COUNT]]).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let dir = TempDir::new().unwrap();
        let bytes = tiny_forest().to_json_vec().unwrap();
        let path = dir.path().join(MODEL_FILE);
        let metrics = ArtifactMetrics {
            r2_score: 0.9,
            mae: 1.0,
            cv_mean: 0.9,
        };
        ModelSidecar::new(metrics, MODEL_FILE, b"other bytes")
            .save(dir.path())
            .unwrap();
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(load_model(&path), Err(EstimatorError::Model(_))));
    }

    #[test]
    fn test_sibling_artifact_ignores_other_sidecar() {
        let dir = TempDir::new().unwrap();
        let metrics = ArtifactMetrics {
            r2_score: 0.9,
            mae: 1.0,
            cv_mean: 0.9,
        };
        let trained = tiny_forest().to_json_vec().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), &trained).unwrap();
        ModelSidecar::new(metrics, MODEL_FILE, &trained)
            .save(dir.path())
            .unwrap();

        let candidate_bytes = forest_with_trees(5).to_json_vec().unwrap();
        assert_ne!(candidate_bytes, trained);
        let candidate = dir.path().join("candidate.json");
        std::fs::write(&candidate, &candidate_bytes).unwrap();

        let model = load_model(&candidate).unwrap();
        assert_eq!(model.kind(), "random_forest");
        assert!(load_model(&dir.path().join(MODEL_FILE)).is_ok());
    }

    #[test]
    fn test_sidecar_without_model_file_still_verified() {
        let dir = TempDir::new().unwrap();
        let bytes = tiny_forest().to_json_vec().unwrap();
        let path = dir.path().join("candidate.json");
        std::fs::write(&path, &bytes).unwrap();
        let mut sidecar = ModelSidecar::new(
            ArtifactMetrics {
                r2_score: 0.9,
                mae: 1.0,
                cv_mean: 0.9,
            },
            MODEL_FILE,
            b"other bytes",
        );
        sidecar.model_file = None;
        sidecar.save(dir.path()).unwrap();

        assert!(matches!(load_model(&path), Err(EstimatorError::Model(_))));
    }

    #[test]
    fn test_onnx_extension_routes_to_tract() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();
        match load_model(&path) {
            Err(EstimatorError::Model(msg)) => assert!(msg.contains("ONNX")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}
