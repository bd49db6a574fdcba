//! Resource Predict - CI build resource prediction
//!
//! Reads a JSON build context, runs the trained model and prints the
//! predicted CPU, memory and build time as a single JSON object on stdout.
//! Failures print `{"error": "..."}` on stderr and exit with status 1.

use anyhow::{Context, Result};
use clap::Parser;
use estimator_lib::observability::{EstimatorMetrics, StructuredLogger};
use estimator_lib::predictor::{OutputFormatter, PredictionPayload, PredictionService};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Predict CPU, memory and build time for a CI build
#[derive(Parser, Debug)]
#[command(name = "resource-predict", version)]
struct Args {
    /// JSON file holding the build context
    #[arg(long)]
    input: PathBuf,

    /// Model artifact (.onnx or serialized forest)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Write Prometheus metrics to this textfile on exit
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the payload, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => return fail(&e.to_string()),
    };

    match run(args).await {
        Ok(payload) => match serde_json::to_string(&payload) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e.to_string()),
        },
        Err(e) => fail(&format!("{:#}", e)),
    }
}

async fn run(args: Args) -> Result<PredictionPayload> {
    let config = config::PredictConfig::load()?;
    let formatter = OutputFormatter::with_config(config.output_config());
    let model_path = args.model.unwrap_or(config.model_path);
    let metrics_file = args.metrics_file.or(config.metrics_file);

    let logger = StructuredLogger::new("resource-predict");
    logger.log_startup(VERSION);
    let metrics = EstimatorMetrics::new().context("Failed to initialize metrics")?;

    let input = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;
    debug!(input = %args.input.display(), bytes = input.len(), "Read build context");

    let result = PredictionService::load(&model_path).map(|service| {
        service
            .with_formatter(formatter)
            .with_metrics(metrics.clone())
            .with_logger(logger.clone())
    });
    let payload = match result {
        Ok(service) => service.predict_json(&input),
        Err(e) => {
            metrics.inc_prediction_errors();
            Err(e)
        }
    };

    if let Some(path) = metrics_file {
        if let Err(e) = metrics.write_textfile(&path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    let payload = payload?;
    info!(confidence = %payload.confidence, "Prediction complete");
    Ok(payload)
}

fn fail(message: &str) -> ExitCode {
    eprintln!("{}", json!({ "error": message }));
    ExitCode::FAILURE
}
