//! ONNX model inference using tract
//!
//! Runs externally trained regressors exported to ONNX. The graph takes a
//! `[1, 27]` f32 input and its first output carries cpu, memory and time.

use super::forest::TargetRow;
use super::RegressionModel;
use crate::error::{EstimatorError, Result};
use crate::features::{FeatureRow, FEATURE_COUNT, TARGET_COUNT};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const SLOW_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxModel {
    plan: TractModel,
}

impl OnnxModel {
    /// Parse and optimize an ONNX graph
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| EstimatorError::model(format!("Failed to parse ONNX model: {}", e)))?
            .with_input_fact(0, f32::fact([1, FEATURE_COUNT]).into())
            .map_err(|e| EstimatorError::model(format!("Failed to set input shape: {}", e)))?
            .into_optimized()
            .map_err(|e| EstimatorError::model(format!("Failed to optimize model: {}", e)))?
            .into_runnable()
            .map_err(|e| EstimatorError::model(format!("Failed to create runnable model: {}", e)))?;
        Ok(Self { plan })
    }

    fn row_to_tensor(row: &FeatureRow) -> Result<Tensor> {
        let data: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, FEATURE_COUNT), data)
            .map_err(|e| EstimatorError::model(format!("Invalid input shape: {}", e)))?;
        Ok(array.into())
    }

    fn run_row(&self, row: &FeatureRow) -> Result<TargetRow> {
        let start = Instant::now();
        let input = Self::row_to_tensor(row)?;
        let result = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| EstimatorError::model(format!("Inference failed: {}", e)))?;
        let output = result
            .first()
            .ok_or_else(|| EstimatorError::model("No output from model"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| EstimatorError::model(format!("Unexpected output type: {}", e)))?;
        let values: Vec<f32> = view.iter().copied().collect();
        if values.len() < TARGET_COUNT {
            return Err(EstimatorError::model(format!(
                "Model output has {} values, expected {}",
                values.len(),
                TARGET_COUNT
            )));
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Slow ONNX inference");
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "ONNX inference completed");
        }

        Ok([values[0] as f64, values[1] as f64, values[2] as f64])
    }
}

impl RegressionModel for OnnxModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<TargetRow>> {
        rows.iter().map(|row| self.run_row(row)).collect()
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
