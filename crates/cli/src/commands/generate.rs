//! Synthetic dataset generation

use anyhow::Result;
use colored::Colorize;
use estimator_lib::dataset::{write_dataset, DatasetGenerator, DatasetSummary, TargetStats};
use estimator_lib::observability::{EstimatorMetrics, StructuredLogger};
use serde_json::json;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::config::Config;
use crate::output::{format_rate, print_heading, print_json, print_success, print_table, OutputFormat};

/// Row for category distribution tables
#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Share")]
    share: String,
}

/// Row for the target statistics table
#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Target")]
    target: &'static str,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Max")]
    max: String,
}

/// Row for the pipeline signal rates
#[derive(Tabled)]
struct RateRow {
    #[tabled(rename = "Signal")]
    signal: &'static str,
    #[tabled(rename = "Rate")]
    rate: String,
}

/// Generate the dataset and write both CSV files
pub fn generate(
    config: &Config,
    format: OutputFormat,
    metrics: &EstimatorMetrics,
    logger: &StructuredLogger,
) -> Result<()> {
    let statuses = config.status_distribution()?;
    let mut generator =
        DatasetGenerator::new(config.generator_config())?.with_status_distribution(statuses);
    let records = generator.generate();

    let files = write_dataset(&config.output_dir, &records)?;
    metrics.inc_records_generated(records.len() as u64);
    logger.log_dataset_generated(records.len(), config.seed, &files.dataset);

    let summary = DatasetSummary::from_records(&records);
    summary.log();

    match format {
        OutputFormat::Json => print_json(&json!({
            "dataset_file": files.dataset,
            "training_file": files.training,
            "seed": config.seed,
            "summary": summary,
        }))?,
        OutputFormat::Table => {
            print_heading("Synthetic Dataset");
            println!("Records:                {}", summary.total.to_string().cyan());
            println!("Seed:                   {}", config.seed);
            println!("Dataset file:           {}", files.dataset.display());
            println!("Training file:          {}", files.training.display());
            println!();

            println!("{}", "Project Types".bold());
            print_table(&count_rows(&summary.project_types, summary.total));
            println!();

            println!("{}", "Build Types".bold());
            print_table(&count_rows(&summary.build_types, summary.total));
            println!();

            println!("{}", "Build Statuses".bold());
            print_table(&count_rows(&summary.statuses, summary.total));
            println!();

            println!("{}", "Targets".bold());
            print_table(&target_rows(&summary));
            println!();

            println!("{}", "Pipeline Signals".bold());
            print_table(&rate_rows(&summary));
            println!(
                "Mean test files changed: {:.2}",
                summary.mean_test_files_changed
            );
            println!();

            print_success(&format!(
                "Generated {} records into {}",
                summary.total,
                config.output_dir.display()
            ));
        }
    }

    Ok(())
}

fn count_rows(counts: &BTreeMap<String, usize>, total: usize) -> Vec<CountRow> {
    let mut rows: Vec<CountRow> = counts
        .iter()
        .map(|(value, &count)| CountRow {
            value: value.clone(),
            count,
            share: format_rate(if total > 0 {
                count as f64 / total as f64
            } else {
                0.0
            }),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

fn target_rows(summary: &DatasetSummary) -> Vec<TargetRow> {
    [
        ("cpu_avg_pct", summary.cpu_avg_pct),
        ("memory_gb", summary.memory_gb),
        ("build_time_min", summary.build_time_min),
    ]
    .into_iter()
    .filter_map(|(target, stats): (&'static str, Option<TargetStats>)| {
        stats.map(|s| TargetRow {
            target,
            min: format!("{:.2}", s.min),
            mean: format!("{:.2}", s.mean),
            max: format!("{:.2}", s.max),
        })
    })
    .collect()
}

fn rate_rows(summary: &DatasetSummary) -> Vec<RateRow> {
    [
        ("Cache hit", summary.cache_hit_rate),
        ("E2E tests", summary.e2e_rate),
        ("Emulator", summary.emulator_rate),
        ("Clean build", summary.clean_build_rate),
        ("Monorepo", summary.monorepo_rate),
        ("Artifact publish", summary.artifact_publish_rate),
        ("Working hours", summary.working_hours_share),
    ]
    .into_iter()
    .map(|(signal, rate)| RateRow {
        signal,
        rate: format_rate(rate),
    })
    .collect()
}
