use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while loading, analysing and writing permit data.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// An input or output file could not be opened.
    #[error("Failed to open file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be serialized.
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from a CSV header.
    #[error("Missing column \"{column}\" in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// A date or datetime cell did not match any recognised format.
    #[error("Invalid date \"{value}\" in column \"{column}\" at row {row}")]
    InvalidDate {
        column: String,
        value: String,
        row: u64,
    },

    /// A numeric identifier cell could not be coerced to an integer.
    #[error("Invalid number \"{value}\" in column \"{column}\" at row {row}")]
    InvalidNumber {
        column: String,
        value: String,
        row: u64,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the permit crates.
pub type Result<T> = std::result::Result<T, AnalysisError>;
