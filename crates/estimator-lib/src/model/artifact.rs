//! Model artifact sidecar
//!
//! `features.json` records the feature schema a model was trained on, its
//! evaluation metrics and a SHA256 digest of the model file.

use crate::error::{EstimatorError, Result};
use crate::features::{FEATURE_COLUMNS, TARGET_COLUMNS};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SIDECAR_FILE: &str = "features.json";
pub const MODEL_FILE: &str = "model.json";

/// Headline evaluation metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    pub r2_score: f64,
    pub mae: f64,
    pub cv_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSidecar {
    pub features: Vec<String>,
    pub targets: Vec<String>,
    pub metrics: ArtifactMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_sha256: Option<String>,
}

impl ModelSidecar {
    /// Sidecar for a model trained on the fixed feature schema
    pub fn new(metrics: ArtifactMetrics, model_file: &str, model_bytes: &[u8]) -> Self {
        Self {
            features: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            targets: TARGET_COLUMNS.iter().map(|s| s.to_string()).collect(),
            metrics,
            model_file: Some(model_file.to_string()),
            model_sha256: Some(sha256_hex(model_bytes)),
        }
    }

    /// Sidecar path for a model artifact path
    pub fn path_for(model_path: &Path) -> PathBuf {
        model_path
            .parent()
            .map(|dir| dir.join(SIDECAR_FILE))
            .unwrap_or_else(|| PathBuf::from(SIDECAR_FILE))
    }

    /// Load the sidecar next to `model_path`, if one exists
    pub fn load_for(model_path: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(model_path);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let sidecar = serde_json::from_str(&text)
            .map_err(|e| EstimatorError::model(format!("invalid {}: {}", SIDECAR_FILE, e)))?;
        debug!(path = %path.display(), "Loaded model sidecar");
        Ok(Some(sidecar))
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(SIDECAR_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Whether this sidecar was written for the artifact at `model_path`.
    /// A sidecar that names no file applies to every artifact beside it.
    pub fn describes(&self, model_path: &Path) -> bool {
        match self.model_file.as_deref() {
            None => true,
            Some(name) => model_path
                .file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| f == name),
        }
    }

    /// Check the feature schema and, when recorded, the model digest
    pub fn verify(&self, model_bytes: &[u8]) -> Result<()> {
        let mismatched: Vec<String> = FEATURE_COLUMNS
            .iter()
            .enumerate()
            .filter(|(i, name)| self.features.get(*i).map(String::as_str) != Some(**name))
            .map(|(_, name)| name.to_string())
            .collect();
        if !mismatched.is_empty() || self.features.len() != FEATURE_COLUMNS.len() {
            return Err(EstimatorError::SchemaMismatch {
                missing: mismatched,
            });
        }

        if let Some(expected) = self.model_sha256.as_deref() {
            let actual = sha256_hex(model_bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(EstimatorError::model(format!(
                    "Checksum mismatch: expected {}, got {}",
                    expected, actual
                )));
            }
        }
        Ok(())
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metrics() -> ArtifactMetrics {
        ArtifactMetrics {
            r2_score: 0.91,
            mae: 1.2,
            cv_mean: 0.88,
        }
    }

    #[test]
    fn test_new_sidecar_verifies() {
        let sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"model bytes");
        assert_eq!(sidecar.features.len(), 27);
        assert_eq!(sidecar.targets, vec!["cpu_avg_pct", "memory_gb", "build_time_min"]);
        sidecar.verify(b"model bytes").unwrap();
    }

    #[test]
    fn test_describes_named_file_only() {
        let dir = Path::new("models");
        let sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"m");
        assert!(sidecar.describes(&dir.join(MODEL_FILE)));
        assert!(!sidecar.describes(&dir.join("model.onnx")));

        let unnamed = ModelSidecar {
            model_file: None,
            ..sidecar
        };
        assert!(unnamed.describes(&dir.join("model.onnx")));
    }

    #[test]
    fn test_checksum_mismatch() {
        let sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"model bytes");
        let err = sidecar.verify(b"tampered").unwrap_err();
        assert!(matches!(err, EstimatorError::Model(_)));
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_reordered_features_rejected() {
        let mut sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"m");
        sidecar.features.swap(0, 1);
        match sidecar.verify(b"m").unwrap_err() {
            EstimatorError::SchemaMismatch { missing } => {
                assert_eq!(missing, vec!["project_type", "repo_size_mb"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_feature_rejected() {
        let mut sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"m");
        sidecar.features.push("extra".to_string());
        assert!(matches!(
            sidecar.verify(b"m"),
            Err(EstimatorError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_sidecar_without_digest_skips_checksum() {
        let mut sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"m");
        sidecar.model_sha256 = None;
        sidecar.verify(b"anything").unwrap();
    }

    #[test]
    fn test_save_and_load_next_to_model() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join(MODEL_FILE);
        assert!(ModelSidecar::load_for(&model_path).unwrap().is_none());

        let sidecar = ModelSidecar::new(metrics(), MODEL_FILE, b"m");
        sidecar.save(dir.path()).unwrap();
        let loaded = ModelSidecar::load_for(&model_path).unwrap().unwrap();
        assert_eq!(loaded, sidecar);
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
