//! Stage-level errors.
//!
//! Record-level problems (malformed fields, duplicates) live in the core
//! crate and never abort a run. The errors here do: each one stops its stage
//! and names the file or row responsible.

use std::path::PathBuf;

use thiserror::Error;

/// Reading or writing a CSV artifact failed.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: unexpected header {found:?}, expected {expected:?}", .path.display())]
    Header {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("{} row {row}: {message}", .path.display())]
    InvalidRow {
        path: PathBuf,
        row: usize,
        message: String,
    },
}

impl DatasetError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DatasetError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Loading the dataset into the database failed; nothing was committed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("dataset rejected: {0}")]
    Dataset(#[from] DatasetError),

    #[error("row {row} ({title} {year}): {source}")]
    Row {
        row: usize,
        title: String,
        year: u16,
        #[source]
        source: sqlx::Error,
    },

    #[error("row {row} ({title} {year}): vote count {votes} does not fit the votes column")]
    OutOfRange {
        row: usize,
        title: String,
        year: u16,
        votes: u64,
    },

    #[error("load transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),
}

impl LoadError {
    /// 1-based row of the dataset that caused the failure, when known.
    pub fn row(&self) -> Option<usize> {
        match self {
            LoadError::Dataset(DatasetError::InvalidRow { row, .. }) => Some(*row),
            LoadError::Row { row, .. } | LoadError::OutOfRange { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// The dashboard could not query the table. Recovered by rendering an empty view.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not open database: {0}")]
    Connect(String),

    #[error("dashboard query failed: {0}")]
    Query(#[from] sqlx::Error),
}
