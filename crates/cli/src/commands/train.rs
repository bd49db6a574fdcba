//! Model training

use anyhow::{Context, Result};
use colored::Colorize;
use estimator_lib::observability::{EstimatorMetrics, StructuredLogger};
use estimator_lib::trainer::{ModelTrainer, TrainingReport};
use serde_json::json;
use std::path::Path;
use tabled::Tabled;

use crate::config::Config;
use crate::output::{
    color_r2, print_heading, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for per-target metrics
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Target")]
    target: &'static str,
    #[tabled(rename = "R2")]
    r2: String,
    #[tabled(rename = "MAE")]
    mae: String,
}

/// Row for feature importances
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Feature")]
    feature: &'static str,
    #[tabled(rename = "Importance")]
    importance: String,
}

/// Train a forest from `data_path` and save it into `model_dir`
pub fn train(
    config: &Config,
    data_path: &Path,
    model_dir: &Path,
    format: OutputFormat,
    metrics: &EstimatorMetrics,
    logger: &StructuredLogger,
) -> Result<()> {
    let trainer = ModelTrainer::new(config.trainer_config())
        .with_metrics(metrics.clone())
        .with_logger(logger.clone());
    let threshold = trainer.config().r2_warning_threshold;

    let (report, saved) = trainer
        .train_csv(data_path, model_dir)
        .with_context(|| format!("Training from {} failed", data_path.display()))?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "model_path": saved.model_path,
            "sidecar_path": saved.sidecar_path,
            "report": report,
        }))?,
        OutputFormat::Table => {
            print_report(&report);
            println!();
            if report.evaluation.r2_score < threshold {
                print_warning(&format!(
                    "R2 {:.4} is below the {:.2} target",
                    report.evaluation.r2_score, threshold
                ));
            }
            print_success(&format!("Model saved to {}", saved.model_path.display()));
            println!("Sidecar:                {}", saved.sidecar_path.display());
        }
    }

    Ok(())
}

fn print_report(report: &TrainingReport) {
    print_heading("Training Report");
    println!(
        "Rows:                   {} ({} train / {} test)",
        report.rows, report.train_rows, report.test_rows
    );
    println!("Duration:               {:.2}s", report.duration_secs);
    println!();

    println!("{}", "Evaluation".bold());
    println!("{}", "-".repeat(50));
    println!("R2 (mean):              {}", color_r2(report.evaluation.r2_score));
    println!("MAE (mean):             {:.4}", report.evaluation.mae);
    if report.cv_scores.is_empty() {
        println!("CV R2 (build time):     {}", "skipped".dimmed());
    } else {
        println!(
            "CV R2 (build time):     {} over {} folds",
            color_r2(report.cv_mean),
            report.cv_scores.len()
        );
    }
    println!();

    let rows: Vec<MetricRow> = report
        .evaluation
        .per_target
        .iter()
        .map(|m| MetricRow {
            target: m.target,
            r2: color_r2(m.r2),
            mae: format!("{:.4}", m.mae),
        })
        .collect();
    print_table(&rows);
    println!();

    println!("{}", "Top Features".bold());
    let rows: Vec<ImportanceRow> = report
        .top_features
        .iter()
        .enumerate()
        .map(|(i, f)| ImportanceRow {
            rank: i + 1,
            feature: f.feature,
            importance: format!("{:.4}", f.importance),
        })
        .collect();
    print_table(&rows);
}
