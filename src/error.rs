//! Error taxonomy for loading, configuration, storage, and merging.
//!
//! Only structurally invalid input raises: unreadable bytes, an absent join
//! column, an unknown strategy, or a failed storage call. Heuristics that
//! match nothing never produce an error.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Malformed delimited text near line {line}: {message}")]
    Malformed { line: u64, message: String },
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("drop_row_missing_threshold must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("Invalid noise pattern '{pattern}': {message}")]
    NoisePattern { pattern: String, message: String },
    #[error("Failed to read configuration: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of an end-to-end cleaning run.
#[derive(Debug, Error)]
pub enum CleanError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Dataset '{0}' is locked by another writer")]
    Locked(String),
    #[error("No stored table for dataset '{0}'")]
    NotFound(String),
    #[error("Invalid dataset id '{0}': use letters, digits, '-' or '_'")]
    InvalidId(String),
    #[error("Storage I/O failure: {0}")]
    Io(#[from] io::Error),
    #[error("Stored table is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Stored table metadata is invalid: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the failure may clear up if the caller simply tries again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Locked(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSide {
    Existing,
    New,
}

impl std::fmt::Display for TableSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSide::Existing => f.write_str("existing"),
            TableSide::New => f.write_str("new"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Unknown merge strategy: {0}")]
    UnknownStrategy(String),
    #[error("Unknown join type: {0}")]
    UnknownJoinType(String),
    #[error("merge_column is required for merge_on_column strategy")]
    MissingMergeColumn,
    #[error("Merge column '{column}' not found in {side} dataset")]
    MissingColumn { column: String, side: TableSide },
    #[error("Failed to load existing dataset: {0}")]
    Storage(#[from] StoreError),
}
