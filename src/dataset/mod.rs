//! Loading profile records from dataset files.
//!
//! The dispatcher does not care what a profile looks like, so records are
//! loaded as opaque JSON values. Parquet, JSON Lines, and JSON array files
//! are supported; the format is picked from the file extension.

use std::fs::File;
use std::path::Path;

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dataset: {0}")]
    InvalidData(String),
}

/// Reads profile records from a dataset file.
///
/// The format is chosen by extension: `.parquet`, `.jsonl`/`.ndjson`, or
/// `.json` (a top-level array of records). Each record comes back as one
/// opaque JSON value.
pub fn read_profiles(path: &Path) -> Result<Vec<serde_json::Value>, DatasetError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let records = match extension.as_str() {
        "parquet" => read_parquet_records(path)?,
        "jsonl" | "ndjson" => read_jsonl_records(path)?,
        "json" => read_json_records(path)?,
        other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
    };

    info!(
        path = %path.display(),
        records = records.len(),
        "Profile records loaded"
    );

    Ok(records)
}

/// Reads a Parquet file into JSON rows, whatever its schema.
fn read_parquet_records(path: &Path) -> Result<Vec<serde_json::Value>, DatasetError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let reader = builder.build()?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;

        let mut writer = arrow::json::ArrayWriter::new(Vec::new());
        writer.write(&batch)?;
        writer.finish()?;

        let rows: Vec<serde_json::Value> = serde_json::from_slice(&writer.into_inner())?;
        records.extend(rows);
    }

    Ok(records)
}

/// Reads a JSON Lines file, skipping blank lines.
fn read_jsonl_records(path: &Path) -> Result<Vec<serde_json::Value>, DatasetError> {
    let contents = std::fs::read_to_string(path)?;

    let mut records = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(line)?);
    }

    Ok(records)
}

/// Reads a JSON file holding a top-level array of records.
fn read_json_records(path: &Path) -> Result<Vec<serde_json::Value>, DatasetError> {
    let contents = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;

    match value {
        serde_json::Value::Array(records) => Ok(records),
        _ => Err(DatasetError::InvalidData(
            "top-level JSON must be an array of records".to_string(),
        )),
    }
}
