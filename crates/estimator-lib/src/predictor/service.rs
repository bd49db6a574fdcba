//! Prediction service
//!
//! Engineers features from a build context, runs the regression model and
//! post-processes its output into the prediction payload.

use super::output::{assess_confidence, OutputFormatter, Prediction};
use crate::error::{EstimatorError, Result};
use crate::features::{
    row_from_lookup, BuildContext, Clock, FeatureEngineer, FeatureVector, SystemClock,
    FEATURE_COUNT,
};
use crate::model::{load_model, RegressionModel};
use crate::models::Confidence;
use crate::observability::{EstimatorMetrics, StructuredLogger};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Value of the payload's `method` field
pub const PREDICTION_METHOD: &str = "ml_enhanced_prediction";

/// JSON document printed by the prediction CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPayload {
    pub cpu: f64,
    #[serde(rename = "memoryGb")]
    pub memory_gb: f64,
    #[serde(rename = "timeMinutes")]
    pub time_minutes: f64,
    pub method: &'static str,
    pub features_used: usize,
    pub confidence: Confidence,
    /// Engineered features, present when the context asked for debug output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

impl PredictionPayload {
    fn new(prediction: Prediction, features: Option<FeatureVector>) -> Self {
        Self {
            cpu: prediction.cpu,
            memory_gb: prediction.memory_gb,
            time_minutes: prediction.time_minutes,
            method: PREDICTION_METHOD,
            features_used: FEATURE_COUNT,
            confidence: prediction.confidence,
            features,
        }
    }
}

pub struct PredictionService<C: Clock = SystemClock> {
    model: Box<dyn RegressionModel>,
    engineer: FeatureEngineer<C>,
    formatter: OutputFormatter,
    metrics: Option<EstimatorMetrics>,
    logger: Option<StructuredLogger>,
}

impl PredictionService<SystemClock> {
    pub fn new(model: Box<dyn RegressionModel>) -> Self {
        Self::with_engineer(model, FeatureEngineer::new())
    }

    /// Load the model artifact at `path`
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_model(path)?))
    }
}

impl<C: Clock> PredictionService<C> {
    pub fn with_engineer(model: Box<dyn RegressionModel>, engineer: FeatureEngineer<C>) -> Self {
        Self {
            model,
            engineer,
            formatter: OutputFormatter::new(),
            metrics: None,
            logger: None,
        }
    }

    pub fn with_formatter(mut self, formatter: OutputFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_metrics(mut self, metrics: EstimatorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Predict from an engineered feature vector.
    ///
    /// The model row is assembled by name in schema order.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let row = row_from_lookup(|name| features.get(name));
        let raw = self
            .model
            .predict(&[row])?
            .into_iter()
            .next()
            .ok_or_else(|| EstimatorError::model("model returned no predictions"))?;
        debug!(cpu = raw[0], memory_gb = raw[1], time_min = raw[2], "Raw model output");
        Ok(self.formatter.format(raw, assess_confidence(features)))
    }

    pub fn predict_context(&self, context: &BuildContext) -> Result<PredictionPayload> {
        let start = Instant::now();
        let features = self.engineer.engineer(context);
        let prediction = self.predict(&features)?;

        if let Some(metrics) = &self.metrics {
            metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
            metrics.inc_predictions(prediction.confidence);
        }
        if let Some(logger) = &self.logger {
            logger.log_prediction(
                prediction.cpu,
                prediction.memory_gb,
                prediction.time_minutes,
                prediction.confidence,
                self.model.kind(),
            );
        }

        Ok(PredictionPayload::new(
            prediction,
            context.debug.then_some(features),
        ))
    }

    /// Parse a JSON build context and predict
    pub fn predict_json(&self, input: &str) -> Result<PredictionPayload> {
        let result = BuildContext::from_json_str(input).and_then(|ctx| self.predict_context(&ctx));
        if let Err(e) = &result {
            if let Some(metrics) = &self.metrics {
                metrics.inc_prediction_errors();
            }
            if let Some(logger) = &self.logger {
                logger.log_prediction_failed(&e.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureRow, FixedClock};
    use crate::model::TargetRow;
    use std::sync::{Arc, Mutex};

    /// Returns a fixed output and records the rows it was given
    struct StubModel {
        output: TargetRow,
        seen: Arc<Mutex<Vec<FeatureRow>>>,
    }

    impl RegressionModel for StubModel {
        fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<TargetRow>> {
            self.seen.lock().unwrap().extend_from_slice(rows);
            Ok(vec![self.output; rows.len()])
        }

        fn kind(&self) -> &'static str {
            "stub"
        }
    }

    fn service(output: TargetRow) -> (PredictionService<FixedClock>, Arc<Mutex<Vec<FeatureRow>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = StubModel {
            output,
            seen: seen.clone(),
        };
        let engineer = FeatureEngineer::with_clock(FixedClock(9));
        (PredictionService::with_engineer(Box::new(model), engineer), seen)
    }

    #[test]
    fn test_payload_shape() {
        let (svc, _) = service([62.34, 4.567, 18.25]);
        let payload = svc.predict_json(r#"{"projectType": "java"}"#).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["cpu"], 62.3);
        assert_eq!(json["memoryGb"], 4.57);
        assert_eq!(json["method"], "ml_enhanced_prediction");
        assert_eq!(json["features_used"], 27);
        assert_eq!(json["confidence"], "low");
        assert!(json.get("features").is_none());
    }

    #[test]
    fn test_negative_model_output_clamped() {
        let (svc, _) = service([-20.0, -1.0, -5.0]);
        let payload = svc.predict_json("{}").unwrap();
        assert_eq!(payload.cpu, 10.0);
        assert_eq!(payload.memory_gb, 0.5);
        assert_eq!(payload.time_minutes, 1.0);
    }

    #[test]
    fn test_row_in_schema_order() {
        let (svc, seen) = service([50.0, 4.0, 10.0]);
        svc.predict_json(
            r#"{"projectType": "android", "branch": "release/v2.1.0", "buildType": "release",
                "hasE2ETests": true, "usesEmulator": true}"#,
        )
        .unwrap();
        let rows = seen.lock().unwrap();
        let row = rows[0];
        assert_eq!(row[0], 4.0); // project_type
        assert_eq!(row[3], 4.0); // branch_type
        assert_eq!(row[4], 1.0); // build_type
        assert_eq!(row[17], 1.0); // has_e2e_tests
        assert_eq!(row[20], 1.0); // uses_emulator
        assert_eq!(row[26], 9.0); // time_of_day_hour from the clock
    }

    #[test]
    fn test_debug_includes_features() {
        let (svc, _) = service([50.0, 4.0, 10.0]);
        let payload = svc
            .predict_json(r#"{"projectType": "ios", "debug": true}"#)
            .unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["features"]["project_type"], 5);
        assert_eq!(json["features"]["stages_count"], 3);
    }

    #[test]
    fn test_invalid_json_is_input_error() {
        let (svc, _) = service([50.0, 4.0, 10.0]);
        assert!(matches!(
            svc.predict_json("not json"),
            Err(EstimatorError::InputParse(_))
        ));
        assert!(matches!(
            svc.predict_json(r#"{"filesChanged": "many"}"#),
            Err(EstimatorError::InputParse(_))
        ));
    }

    #[test]
    fn test_metrics_recorded() {
        let metrics = EstimatorMetrics::new().unwrap();
        let (svc, _) = service([50.0, 4.0, 10.0]);
        let svc = svc.with_metrics(metrics.clone());
        svc.predict_json("{}").unwrap();
        let _ = svc.predict_json("[");
        let text = metrics.render().unwrap();
        assert!(text.contains("cire_predictions_total{confidence=\"low\"} 1"));
        assert!(text.contains("cire_prediction_errors_total 1"));
    }

    #[test]
    fn test_load_missing_model() {
        let path = Path::new("/nonexistent/model.json");
        assert!(matches!(
            PredictionService::load(path),
            Err(EstimatorError::ModelNotFound(_))
        ));
    }
}
