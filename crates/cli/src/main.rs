//! CI Resource Estimator CLI
//!
//! Generates synthetic build datasets, trains the resource model and
//! shows the static resource profile table.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{generate, profiles, train};
use estimator_lib::observability::{EstimatorMetrics, StructuredLogger};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CI Resource Estimator CLI
#[derive(Parser)]
#[command(name = "cire")]
#[command(author, version, about = "CLI for the CI Resource Estimator", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/cire/config.json)
    #[arg(long, global = true, env = "CIRE_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Write Prometheus metrics to this textfile on exit
    #[arg(long, global = true)]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a synthetic training dataset
    Generate {
        /// Number of records to generate
        #[arg(long, short)]
        records: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Directory receiving the CSV files
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Build status weights, e.g. "success=0.9,failed=0.1"
        #[arg(long)]
        status_weights: Option<String>,
    },

    /// Train the resource model from a training CSV
    Train {
        /// Training CSV (features followed by targets)
        #[arg(long, default_value = "data/training_features.csv")]
        data_path: PathBuf,

        /// Directory receiving model.json and features.json
        #[arg(long)]
        model_path: Option<PathBuf>,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Show the resource profile table
    Profiles {
        /// Only show this project type
        #[arg(long, short)]
        project: Option<String>,
    },
}

/// Forest hyperparameter overrides
#[derive(Args)]
pub struct ForestArgs {
    /// Number of trees
    #[arg(long)]
    pub n_estimators: Option<usize>,

    /// Maximum tree depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long)]
    pub min_samples_split: Option<usize>,

    /// Minimum samples in each leaf
    #[arg(long)]
    pub min_samples_leaf: Option<usize>,

    /// Features considered per split
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Seed for the split and the forest
    #[arg(long)]
    pub seed: Option<u64>,

    /// Cross-validation folds (below 2 disables it)
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Minimum rows required to train
    #[arg(long)]
    pub min_rows: Option<usize>,
}

impl ForestArgs {
    fn apply(&self, config: &mut config::Config) {
        if let Some(v) = self.n_estimators {
            config.n_estimators = v;
        }
        if let Some(v) = self.max_depth {
            config.max_depth = v;
        }
        if let Some(v) = self.min_samples_split {
            config.min_samples_split = v;
        }
        if let Some(v) = self.min_samples_leaf {
            config.min_samples_leaf = v;
        }
        if self.max_features.is_some() {
            config.max_features = self.max_features;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.cv_folds {
            config.cv_folds = v;
        }
        if let Some(v) = self.min_rows {
            config.min_rows = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let mut config = config::Config::load(cli.config.as_deref())?;
    let logger = StructuredLogger::new("cire");
    logger.log_startup(VERSION);
    let metrics = EstimatorMetrics::new().context("Failed to initialize metrics")?;
    let format = cli.format;

    let result = match cli.command {
        Commands::Generate {
            records,
            seed,
            output_dir,
            status_weights,
        } => {
            if let Some(v) = records {
                config.records = v;
            }
            if let Some(v) = seed {
                config.seed = v;
            }
            if let Some(v) = output_dir {
                config.output_dir = v;
            }
            if status_weights.is_some() {
                config.status_weights = status_weights;
            }
            let (metrics, logger) = (metrics.clone(), logger.clone());
            tokio::task::spawn_blocking(move || {
                generate::generate(&config, format, &metrics, &logger)
            })
            .await
            .context("Generation task panicked")?
        }
        Commands::Train {
            data_path,
            model_path,
            forest,
        } => {
            forest.apply(&mut config);
            let model_dir = model_path.unwrap_or_else(|| config.model_dir.clone());
            let (metrics, logger) = (metrics.clone(), logger.clone());
            tokio::task::spawn_blocking(move || {
                train::train(&config, &data_path, &model_dir, format, &metrics, &logger)
            })
            .await
            .context("Training task panicked")?
        }
        Commands::Profiles { project } => profiles::show_profiles(project.as_deref(), format),
    };

    if let Some(path) = &cli.metrics_file {
        if let Err(e) = metrics.write_textfile(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    result
}
