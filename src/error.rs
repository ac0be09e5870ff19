//! Error types for hydroglue
//!
//! Storage errors abort an analysis session; statistic errors on optional
//! outputs (density curves) are downgraded locally and never reach this enum.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Hydroglue error types
#[derive(Error, Debug)]
pub enum Error {
    /// Run-record table missing or its schema does not match the expected
    /// column layout. Fatal: the analysis session cannot start.
    #[error("run-record table unavailable at {path}: {reason}")]
    StorageUnavailable {
        /// Path of the table that could not be opened
        path: PathBuf,
        /// Why the open failed (missing file, schema mismatch, decode error)
        reason: String,
    },

    /// Rewrite of the table failed. The original file is untouched; only the
    /// prune operation is lost.
    #[error("run-record table rewrite failed: {0}\nThe original table was not modified")]
    StorageWriteError(String),

    /// A period boundary year falls outside the observed series range.
    /// Caller configuration error.
    #[error("period boundary {year} outside series range: {reason}")]
    InvalidPeriod {
        /// The offending calendar year
        year: i32,
        /// What the boundary violated
        reason: String,
    },

    /// A statistic was requested over an empty set (percentile band of zero
    /// behavioral runs, best run of an empty table).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
