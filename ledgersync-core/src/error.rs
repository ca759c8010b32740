//! Error taxonomy shared by every ledgersync crate.
//!
//! Configuration errors abort a run before anything is written. Row-level
//! problems are carried as [`RowError`] values in the run report instead.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sheet '{0}' not found")]
    MissingSheet(String),

    #[error("sheet '{sheet}': column {column} for field '{field}' is outside the header ({width} columns)")]
    MissingColumn {
        sheet: String,
        field: &'static str,
        column: usize,
        width: usize,
    },

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("write to '{sheet}' failed: {message}")]
    Write { sheet: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LedgerError {
    /// True for errors that must abort the run (broken sheet layout).
    pub fn is_configuration(&self) -> bool {
        matches!(self, LedgerError::MissingSheet(_) | LedgerError::MissingColumn { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A single unusable row. The run skips it and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub sheet: String,
    /// 1-based sheet row (header is row 1).
    pub row: usize,
    pub message: String,
}

impl RowError {
    pub fn new(sheet: impl Into<String>, row: usize, err: impl std::fmt::Display) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} row {}: {}", self.sheet, self.row, self.message)
    }
}
