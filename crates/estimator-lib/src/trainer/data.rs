//! Training CSV loading

use crate::error::{EstimatorError, Result};
use crate::features::{FeatureRow, FEATURE_COLUMNS, FEATURE_COUNT, TARGET_COLUMNS, TARGET_COUNT};
use crate::model::TargetRow;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Status values kept for training when a `status` column exists
const SUCCESS_STATUSES: [&str; 2] = ["success", "SUCCESS"];

/// Feature matrix and targets parsed from a training CSV
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    pub features: Vec<FeatureRow>,
    pub targets: Vec<TargetRow>,
}

impl TrainingData {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let data = Self::from_reader(file)?;
        info!(path = %path.display(), rows = data.len(), "Loaded training data");
        Ok(data)
    }

    /// Parse a CSV with a header row.
    ///
    /// Columns are located by name, so extra columns and any column order
    /// are accepted. Empty cells read as 0.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let feature_idx: Vec<Option<usize>> =
            FEATURE_COLUMNS.iter().map(|&c| position(c)).collect();
        let target_idx: Vec<Option<usize>> =
            TARGET_COLUMNS.iter().map(|&c| position(c)).collect();
        let missing: Vec<String> = FEATURE_COLUMNS
            .iter()
            .zip(&feature_idx)
            .chain(TARGET_COLUMNS.iter().zip(&target_idx))
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EstimatorError::SchemaMismatch { missing });
        }
        let feature_idx: Vec<usize> = feature_idx.into_iter().flatten().collect();
        let target_idx: Vec<usize> = target_idx.into_iter().flatten().collect();
        let status_idx = position("status");

        let mut data = TrainingData::default();
        let mut skipped = 0usize;
        for (line, record) in csv.records().enumerate() {
            let record = record?;
            if let Some(idx) = status_idx {
                let status = record.get(idx).unwrap_or("").trim();
                if !SUCCESS_STATUSES.contains(&status) {
                    skipped += 1;
                    continue;
                }
            }

            let mut row = [0.0; FEATURE_COUNT];
            for ((slot, &idx), name) in row.iter_mut().zip(&feature_idx).zip(FEATURE_COLUMNS) {
                *slot = parse_cell(&record, idx, name, line)?;
            }
            let mut target = [0.0; TARGET_COUNT];
            for ((slot, &idx), name) in target.iter_mut().zip(&target_idx).zip(TARGET_COLUMNS) {
                *slot = parse_cell(&record, idx, name, line)?;
            }
            data.features.push(row);
            data.targets.push(target);
        }

        if skipped > 0 {
            debug!(skipped, "Dropped rows without a successful status");
        }
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> TrainingData {
        TrainingData {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

fn parse_cell(record: &csv::StringRecord, idx: usize, column: &str, line: usize) -> Result<f64> {
    let cell = record.get(idx).unwrap_or("").trim();
    if cell.is_empty() {
        return Ok(0.0);
    }
    cell.parse::<f64>().map_err(|_| {
        EstimatorError::input(format!(
            "row {}: column '{}' is not numeric: '{}'",
            line + 1,
            column,
            cell
        ))
    })
}
