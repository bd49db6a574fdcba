//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use estimator_lib::profile::Interval;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format an interval as `min - max`
pub fn format_interval(interval: &Interval) -> String {
    format!("{:.1} - {:.1}", interval.min, interval.max)
}

/// Format a 0-1 rate as a percentage
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Color an R2 score against the 0.75 target
pub fn color_r2(r2: f64) -> String {
    let formatted = format!("{:.4}", r2);
    if r2 >= 0.75 {
        formatted.green().to_string()
    } else if r2 >= 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
