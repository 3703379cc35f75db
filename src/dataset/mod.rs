//! Tabular log datasets: loading, column access and atomic output.

pub mod loader;
pub mod writer;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub use loader::load;
pub use writer::write_atomic;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: required column '{column}' is missing", .path.display())]
    Schema { path: PathBuf, column: String },

    #[error(
        "{}: line {line}, column '{column}': cannot parse {value:?} as a number: {reason}",
        .path.display()
    )]
    Parse {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    #[error("{}: malformed row at line {line}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

/// Coarse error class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Io,
    Schema,
    Parse,
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::Io { .. } => ErrorKind::Io,
            DatasetError::Schema { .. } => ErrorKind::Schema,
            DatasetError::Parse { .. } | DatasetError::Malformed { .. } => ErrorKind::Parse,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify an error raised by the `csv` crate while reading or writing `path`.
    pub(crate) fn from_csv(path: &Path, err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => DatasetError::io(path, source),
            _ => DatasetError::Malformed {
                path: path.to_path_buf(),
                line,
                reason,
            },
        }
    }
}

/// Delimiter settings shared by the loader and the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// One observation: the raw field values of a data row, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: Vec<String>,
}

impl Record {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Line in the source file where this record starts (header is line 1).
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// An ordered batch of records read from a single file.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    headers: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(path: PathBuf, headers: Vec<String>, records: Vec<Record>) -> Self {
        Self {
            path,
            headers,
            records,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Result<usize, DatasetError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| DatasetError::Schema {
                path: self.path.clone(),
                column: column.to_string(),
            })
    }

    /// Raw text of `column` for every record, in input order.
    pub fn text_column(&self, column: &str) -> Result<Vec<&str>, DatasetError> {
        let idx = self.column_index(column)?;
        Ok(self
            .records
            .iter()
            .map(|r| r.get(idx).unwrap_or_default())
            .collect())
    }

    /// Values of `column` parsed as `f64`. The first value that does not
    /// parse aborts the whole column.
    pub fn numeric_column(&self, column: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self.column_index(column)?;
        self.records
            .iter()
            .map(|record| {
                let raw = record.get(idx).unwrap_or_default();
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| DatasetError::Parse {
                        path: self.path.clone(),
                        line: record.line(),
                        column: column.to_string(),
                        value: raw.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect()
    }
}
