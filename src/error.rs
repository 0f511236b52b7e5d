use std::io;

use thiserror::Error;

/// Failures raised by the data-to-geometry pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Every input record was filtered out (or there were none to begin with).
    /// Callers are expected to fall back to another dataset or report it.
    #[error("no valid records to render ({total} read, 0 usable)")]
    EmptyDataset { total: usize },
    /// The records span more years than the grid may hold columns for.
    #[error("years {year_min}..={year_max} need more than {limit} time bins")]
    TimeSpanTooLarge {
        year_min: i32,
        year_max: i32,
        limit: usize,
    },
    #[error("genre '{0}' is not present in the genre index")]
    GenreNotIndexed(String),
}

/// Failures while reading a tabular dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no header row")]
    MissingHeader,
}

/// Failures while reading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color '{0}': expected #rrggbb")]
    InvalidColor(String),
    #[error("{field} must be {requirement}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
    },
}
