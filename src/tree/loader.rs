use std::fs::{self, File};
use std::path::Path;

use serde::Deserialize;

use crate::engine::{EngineError, EngineResult};

/// One observation: a species and one of its genetic marker sequences.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Record {
    pub species: String,
    #[serde(default)]
    pub genetic_marker: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub cluster: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(EngineError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_error(path: &Path, message: impl ToString) -> EngineError {
    EngineError::Parse {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Reads species records from a `.csv` or `.json` file.
///
/// CSV needs a header row with at least a `species` column. JSON is an array
/// of objects with the same keys. Rows with a blank species are dropped.
pub fn load_records(path: &Path) -> EngineResult<Vec<Record>> {
    let format = DataFormat::from_path(path)?;
    let records = match format {
        DataFormat::Csv => read_csv(path)?,
        DataFormat::Json => read_json(path)?,
    };

    let total = records.len();
    let records = records
        .into_iter()
        .filter(|record| !record.species.trim().is_empty())
        .collect::<Vec<_>>();
    if records.len() < total {
        log::warn!(
            "{}: skipped {} rows without a species",
            path.display(),
            total - records.len()
        );
    }
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn read_csv(path: &Path) -> EngineResult<Vec<Record>> {
    let file = File::open(path).map_err(|error| io_error(path, error))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    reader
        .deserialize::<Record>()
        .map(|row| row.map_err(|error| parse_error(path, error)))
        .collect()
}

fn read_json(path: &Path) -> EngineResult<Vec<Record>> {
    let text = fs::read_to_string(path).map_err(|error| io_error(path, error))?;
    serde_json::from_str(&text).map_err(|error| parse_error(path, error))
}
