use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::TableId;

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

/// The export could not be read or does not have the expected layout.
///
/// Fatal to the import that raised it; never touches cache state.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: malformed CSV in sub-table {table}: {source}", path.display())]
    Csv {
        path: PathBuf,
        table: usize,
        #[source]
        source: csv::Error,
    },

    #[error("{}: expected sub-table {index}, file has only {found}", path.display())]
    MissingSubTable {
        path: PathBuf,
        index: usize,
        found: usize,
    },

    #[error("{}: no cell at sub-table {table}, row {row}, column {column}", path.display())]
    MissingCell {
        path: PathBuf,
        table: usize,
        row: usize,
        column: usize,
    },

    #[error("{}: {what} {value:?} is not a number", path.display())]
    InvalidNumber {
        path: PathBuf,
        what: &'static str,
        value: String,
    },

    #[error("{}: batch and subbatch counts must be positive, got {batch} x {subbatch}", path.display())]
    NonPositiveCount {
        path: PathBuf,
        batch: i64,
        subbatch: i64,
    },

    #[error("{}: sample {batch}-{subbatch} has non-positive dimensions", path.display())]
    InvalidDimensions {
        path: PathBuf,
        batch: u32,
        subbatch: u32,
    },
}

/// Failure to produce data for one sample coordinate.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Declared by the header but missing from the file. Callers skip it.
    #[error("sample {batch}-{subbatch} has no data block")]
    OutOfRange { batch: u32, subbatch: u32 },

    #[error(transparent)]
    Format(#[from] FormatError),
}

// ---------------------------------------------------------------------------
// Numeric errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputationError {
    #[error("regression window {start}..{end} covers {points} point(s), cannot fit a line")]
    DegenerateWindow { start: f64, end: f64, points: usize },

    #[error("curve has no points")]
    EmptyCurve,

    #[error("nothing is selected")]
    EmptySelection,

    #[error("none of the selected samples could be evaluated")]
    NoUsableSamples,
}

// ---------------------------------------------------------------------------
// Selection cache errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("table {0} is not part of the selection")]
    UnknownTable(TableId),

    #[error("sample {batch}-{subbatch} of table {table} is not selected")]
    NotSelected {
        table: TableId,
        batch: u32,
        subbatch: u32,
    },

    #[error("truncation must be within 0..=100, got {0}")]
    InvalidTruncation(u8),

    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Saving or loading a snapshot document failed.
///
/// A failed restore leaves the cache exactly as it was.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("snapshot {} is not valid JSON: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("snapshot {} is not a selection document: {reason}", path.display())]
    NotASnapshot { path: PathBuf, reason: String },

    #[error("snapshot schema version {0} is not supported")]
    UnsupportedVersion(u64),

    #[error("the current selection is not empty")]
    CacheNotEmpty,

    #[error("no snapshot file is associated with this session")]
    NoPath,
}

impl PersistenceError {
    /// Status code of the snapshot interface: `-2` when the restore was
    /// refused because the cache is not empty, `-1` for everything else.
    pub fn status_code(&self) -> i32 {
        match self {
            PersistenceError::CacheNotEmpty => -2,
            _ => -1,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration and boundary parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionSyntaxError {
    #[error("selection item {0:?} must look like batch-subbatch or batch-subbatch-truncation")]
    Shape(String),

    #[error("selection item {item:?}: {value:?} is not a positive integer")]
    NotANumber { item: String, value: String },

    #[error("selection item {item:?}: truncation {value} is above 100")]
    Truncation { item: String, value: u32 },
}
