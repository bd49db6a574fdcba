//! Observability infrastructure for the estimator
//!
//! Provides:
//! - Prometheus metrics (records generated, predictions, latency, training results)
//!   written in the textfile exposition format for batch runs
//! - Structured JSON logging with tracing

use crate::error::{EstimatorError, Result};
use crate::models::Confidence;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

struct EstimatorMetricsInner {
    registry: Registry,
    records_generated: IntCounter,
    predictions: IntCounterVec,
    prediction_errors: IntCounter,
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Gauge,
    training_rows: IntGauge,
    model_r2_score: Gauge,
}

/// Estimator metrics for Prometheus exposition
///
/// Each handle owns a private registry, so independent runs and tests never
/// collide on metric names. Clones share the same metrics.
#[derive(Clone)]
pub struct EstimatorMetrics {
    inner: Arc<EstimatorMetricsInner>,
}

impl EstimatorMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let records_generated = IntCounter::new(
            "cire_records_generated_total",
            "Total number of synthetic build records generated",
        )?;
        let predictions = IntCounterVec::new(
            Opts::new(
                "cire_predictions_total",
                "Total number of resource predictions served",
            ),
            &["confidence"],
        )?;
        let prediction_errors = IntCounter::new(
            "cire_prediction_errors_total",
            "Total number of failed predictions",
        )?;
        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "cire_prediction_latency_seconds",
                "Time spent engineering features and running the model",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let training_duration_seconds = Gauge::new(
            "cire_training_duration_seconds",
            "Wall time of the last model training run",
        )?;
        let training_rows = IntGauge::new(
            "cire_training_rows",
            "Rows used by the last model training run",
        )?;
        let model_r2_score = Gauge::new(
            "cire_model_r2_score",
            "Held-out R2 score of the last trained model",
        )?;

        registry.register(Box::new(records_generated.clone()))?;
        registry.register(Box::new(predictions.clone()))?;
        registry.register(Box::new(prediction_errors.clone()))?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;
        registry.register(Box::new(training_duration_seconds.clone()))?;
        registry.register(Box::new(training_rows.clone()))?;
        registry.register(Box::new(model_r2_score.clone()))?;

        Ok(Self {
            inner: Arc::new(EstimatorMetricsInner {
                registry,
                records_generated,
                predictions,
                prediction_errors,
                prediction_latency_seconds,
                training_duration_seconds,
                training_rows,
                model_r2_score,
            }),
        })
    }

    pub fn inc_records_generated(&self, count: u64) {
        self.inner.records_generated.inc_by(count);
    }

    pub fn inc_predictions(&self, confidence: Confidence) {
        self.inner
            .predictions
            .with_label_values(&[confidence.as_str()])
            .inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner.prediction_errors.inc();
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner.prediction_latency_seconds.observe(duration_secs);
    }

    /// Record the outcome of a training run
    pub fn set_training_result(&self, rows: usize, r2_score: f64, duration_secs: f64) {
        self.inner.training_rows.set(rows as i64);
        self.inner.model_r2_score.set(r2_score);
        self.inner.training_duration_seconds.set(duration_secs);
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|e| {
                EstimatorError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;
        String::from_utf8(buffer).map_err(|e| {
            EstimatorError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Write metrics for the node-exporter textfile collector.
    ///
    /// Writes to a temporary sibling first and renames it into place so the
    /// collector never reads a partial file.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let text = self.render()?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Structured logger for estimator events
///
/// Emits one JSON event per significant occurrence with a fixed `event`
/// field, so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "started",
            component = %self.component,
            version = %version,
            "Estimator started"
        );
    }

    pub fn log_dataset_generated(&self, records: usize, seed: u64, output: &Path) {
        info!(
            event = "dataset_generated",
            component = %self.component,
            records = records,
            seed = seed,
            output = %output.display(),
            "Synthetic dataset generated"
        );
    }

    pub fn log_model_trained(
        &self,
        rows: usize,
        r2_score: f64,
        mae: f64,
        cv_mean: f64,
        duration_secs: f64,
    ) {
        info!(
            event = "model_trained",
            component = %self.component,
            rows = rows,
            r2_score = r2_score,
            mae = mae,
            cv_mean = cv_mean,
            duration_secs = duration_secs,
            "Model trained"
        );
    }

    pub fn log_prediction(
        &self,
        cpu: f64,
        memory_gb: f64,
        time_minutes: f64,
        confidence: Confidence,
        model_kind: &str,
    ) {
        info!(
            event = "prediction_generated",
            component = %self.component,
            cpu = cpu,
            memory_gb = memory_gb,
            time_minutes = time_minutes,
            confidence = %confidence,
            model_kind = %model_kind,
            "Generated resource prediction"
        );
    }

    pub fn log_prediction_failed(&self, error: &str) {
        warn!(
            event = "prediction_failed",
            component = %self.component,
            error = %error,
            "Resource prediction failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_independent_registries() {
        let a = EstimatorMetrics::new().unwrap();
        let b = EstimatorMetrics::new().unwrap();
        a.inc_records_generated(10);
        assert!(a.render().unwrap().contains("cire_records_generated_total 10"));
        assert!(b.render().unwrap().contains("cire_records_generated_total 0"));
    }

    #[test]
    fn test_prediction_metrics_rendered() {
        let metrics = EstimatorMetrics::new().unwrap();
        metrics.inc_predictions(Confidence::High);
        metrics.inc_predictions(Confidence::High);
        metrics.observe_prediction_latency(0.002);
        metrics.set_training_result(800, 0.91, 3.5);

        let text = metrics.render().unwrap();
        assert!(text.contains("cire_predictions_total{confidence=\"high\"} 2"));
        assert!(text.contains("cire_prediction_latency_seconds_count 1"));
        assert!(text.contains("cire_model_r2_score 0.91"));
        assert!(text.contains("cire_training_rows 800"));
    }

    #[test]
    fn test_write_textfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cire.prom");
        let metrics = EstimatorMetrics::new().unwrap();
        metrics.inc_prediction_errors();
        metrics.write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("cire_prediction_errors_total 1"));
        assert!(!dir.path().join("cire.prom.tmp").exists());
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("cire");
        assert_eq!(logger.component, "cire");
    }
}
