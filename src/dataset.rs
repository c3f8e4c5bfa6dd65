//! `dataset` module: in-memory tabular data parsed from the source CSV.
//!
//! A [`Dataset`] is an ordered set of column names plus string-valued rows. It
//! is created fresh per tool call, consumed exactly once by the bulk-insert
//! call and discarded after. Column names are upper-cased before any
//! transmission so they match Snowflake's upper-case identifier convention
//! regardless of how the source file is cased.

use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV file not found: {0}")]
    FileNotFound(String),
    #[error(transparent)]
    Read(#[from] csv::Error),
}

/// An ordered, in-memory table: header plus rows of string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parses the CSV file at `path` into a dataset.
    ///
    /// The first record is taken as the header. A file with a header and no
    /// data rows is valid and yields an empty dataset.
    pub fn from_csv_path(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::FileNotFound(path.display().to_string()));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        info!(
            rows = rows.len(),
            columns = columns.len(),
            path = %path.display(),
            "Loaded CSV"
        );
        Ok(Dataset { columns, rows })
    }

    /// Upper-cases every column name in place.
    ///
    /// Strict normalisation policy: applied to all columns before any
    /// transmission, not best-effort.
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.to_uppercase();
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
