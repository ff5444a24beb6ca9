//! Raw event log records and CSV ingest.
//!
//! The log carries more columns than modeling needs; ingest projects each row
//! onto the six fields below and ignores everything else. A missing column is
//! a hard error for the whole dataset. An unparseable `START_TIME_epoc` cell
//! is read as `None` and fails only the group holding it.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status description marking an in-flight record that is not yet a
/// completed observation.
pub const IN_PROGRESS_STATUS: &str = "Processing";

/// Column names every dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "FILE_NAME",
    "LogicFile",
    "START_TIME",
    "START_TIME_epoc",
    "STAT_DESC",
    "STATUS",
];

/// One row of the raw event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "FILE_NAME")]
    pub file_name: String,
    /// Logical source identifier; the grouping key.
    #[serde(rename = "LogicFile")]
    pub source: String,
    #[serde(rename = "START_TIME")]
    pub start_time: String,
    /// Start time as epoch seconds; `None` when the cell is blank or not a
    /// number, as for records still being written.
    #[serde(rename = "START_TIME_epoc", deserialize_with = "csv::invalid_option")]
    pub start_time_epoch: Option<f64>,
    #[serde(rename = "STAT_DESC")]
    pub status_desc: String,
    #[serde(rename = "STATUS")]
    pub status: String,
}

impl EventRecord {
    pub fn is_in_progress(&self) -> bool {
        self.status_desc == IN_PROGRESS_STATUS
    }
}

/// Parse a CSV event log.
///
/// The header must contain every name in [`REQUIRED_COLUMNS`]; rows are
/// projected onto those columns.
pub fn read_events<R: Read>(reader: R) -> Result<Vec<EventRecord>, CoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| CoreError::Validation(format!("Unreadable dataset header: {e}")))?
        .clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Dataset is missing required columns: {}",
            missing.join(", ")
        )));
    }

    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            // Line numbers are 1-based and the header occupies line 1.
            row.map_err(|e| CoreError::Validation(format!("Malformed dataset row {}: {e}", i + 2)))
        })
        .collect()
}

/// Parse a CSV event log from a file on disk.
pub fn read_events_from_path(path: &Path) -> Result<Vec<EventRecord>, CoreError> {
    let file = std::fs::File::open(path).map_err(|e| {
        CoreError::Validation(format!("Cannot open dataset {}: {e}", path.display()))
    })?;
    read_events(std::io::BufReader::new(file))
}
