//! Regression evaluation metrics

use crate::features::{TARGET_COLUMNS, TARGET_COUNT};
use crate::model::TargetRow;
use serde::Serialize;

/// Coefficient of determination.
///
/// A constant ground truth scores 1.0 when predicted exactly and 0.0
/// otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Metrics of one target column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetMetrics {
    pub target: &'static str,
    pub r2: f64,
    pub mae: f64,
}

/// Held-out evaluation across all targets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    /// Mean of the per-target R2 scores
    pub r2_score: f64,
    /// Mean absolute error over every target value
    pub mae: f64,
    pub per_target: Vec<TargetMetrics>,
}

pub fn column(rows: &[TargetRow], target: usize) -> Vec<f64> {
    rows.iter().map(|r| r[target]).collect()
}

pub fn evaluate(y_true: &[TargetRow], y_pred: &[TargetRow]) -> Evaluation {
    let per_target: Vec<TargetMetrics> = (0..TARGET_COUNT)
        .map(|t| {
            let truth = column(y_true, t);
            let pred = column(y_pred, t);
            TargetMetrics {
                target: TARGET_COLUMNS[t],
                r2: r2_score(&truth, &pred),
                mae: mean_absolute_error(&truth, &pred),
            }
        })
        .collect();

    let r2_score = per_target.iter().map(|m| m.r2).sum::<f64>() / TARGET_COUNT as f64;
    let mae = per_target.iter().map(|m| m.mae).sum::<f64>() / TARGET_COUNT as f64;
    Evaluation {
        r2_score,
        mae,
        per_target,
    }
}

/// Contiguous, unshuffled k-fold test ranges. The first `n % k` folds hold
/// one extra row.
pub fn kfold_ranges(n: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let k = k.clamp(1, n.max(1));
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}
