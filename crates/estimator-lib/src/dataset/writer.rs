//! CSV output for generated datasets

use super::record::SyntheticRecord;
use crate::error::Result;
use crate::features::{FEATURE_COLUMNS, TARGET_COLUMNS};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Full synthetic corpus
pub const DATASET_FILE: &str = "enhanced_training_data.csv";

/// Features followed by targets, ready for training
pub const TRAINING_FILE: &str = "training_features.csv";

/// Paths written by [`write_dataset`]
#[derive(Debug, Clone)]
pub struct DatasetFiles {
    pub dataset: PathBuf,
    pub training: PathBuf,
}

/// Write both CSV files into `dir`, creating it if needed
pub fn write_dataset(dir: &Path, records: &[SyntheticRecord]) -> Result<DatasetFiles> {
    std::fs::create_dir_all(dir)?;
    let files = DatasetFiles {
        dataset: dir.join(DATASET_FILE),
        training: dir.join(TRAINING_FILE),
    };

    write_records(std::fs::File::create(&files.dataset)?, records)?;
    write_training_projection(std::fs::File::create(&files.training)?, records)?;

    info!(
        records = records.len(),
        dataset = %files.dataset.display(),
        training = %files.training.display(),
        "Dataset written"
    );
    Ok(files)
}

/// Serialize full records with a header row
pub fn write_records<W: Write>(writer: W, records: &[SyntheticRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the 27 feature columns then the 3 target columns
pub fn write_training_projection<W: Write>(writer: W, records: &[SyntheticRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(FEATURE_COLUMNS.iter().chain(TARGET_COLUMNS.iter()))?;
    for record in records {
        let row = record
            .features()
            .to_array()
            .into_iter()
            .chain(record.targets())
            .map(|v| v.to_string());
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetGenerator, GeneratorConfig};
    use tempfile::TempDir;

    fn sample(records: usize) -> Vec<SyntheticRecord> {
        DatasetGenerator::new(GeneratorConfig {
            records,
            ..GeneratorConfig::default()
        })
        .unwrap()
        .generate()
    }

    #[test]
    fn test_dataset_header_and_rows() {
        let mut buf = Vec::new();
        write_records(&mut buf, &sample(5)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("build_id,timestamp,pipeline_id,commit_id,project_type"));
        assert!(header.ends_with("memory_gb,cpu_avg_pct,build_time_min,status"));
        assert_eq!(lines.count(), 5);
    }

    #[test]
    fn test_records_read_back() {
        let records = sample(10);
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();
        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let back: Vec<SyntheticRecord> = reader.deserialize().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(back.len(), records.len());
        assert_eq!(back[3].build_id, records[3].build_id);
        assert_eq!(back[3].status, records[3].status);
    }

    #[test]
    fn test_training_projection_columns() {
        let mut buf = Vec::new();
        write_training_projection(&mut buf, &sample(3)).unwrap();
        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 30);
        assert_eq!(&headers[0], "project_type");
        assert_eq!(&headers[26], "time_of_day_hour");
        assert_eq!(&headers[27], "cpu_avg_pct");
        assert_eq!(&headers[29], "build_time_min");
        assert_eq!(reader.records().count(), 3);
    }

    #[test]
    fn test_write_dataset_creates_directory() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/data");
        let files = write_dataset(&out, &sample(4)).unwrap();
        assert!(files.dataset.exists());
        assert!(files.training.exists());
        assert_eq!(files.training.file_name().unwrap(), TRAINING_FILE);
    }
}
