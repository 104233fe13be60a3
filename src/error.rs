//! Error types for the exporters and the benchmark harness

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for exportbench operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for all export operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Destination could not be created or opened
    #[error("Failed to open '{}': {source}", path.display())]
    CreateError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cell style descriptor was rejected
    #[error("Failed to register style: {0}")]
    StyleError(String),

    /// Row-writing channel could not be opened
    #[error("Failed to open stream writer for sheet '{sheet}': {reason}")]
    StreamInitError { sheet: String, reason: String },

    /// Error occurred while writing a row
    #[error("Failed to write row {row} to sheet '{sheet}': {source}")]
    WriteRowError {
        row: u32,
        sheet: String,
        #[source]
        source: Box<ExportError>,
    },

    /// Pending rows could not be rendered
    #[error("Failed to flush stream writer: {0}")]
    FlushError(String),

    /// Package could not be committed to disk
    #[error("Failed to save workbook to '{}': {source}", path.display())]
    SaveError {
        path: PathBuf,
        #[source]
        source: Box<ExportError>,
    },

    /// Invalid cell reference
    #[error("Invalid cell reference: {0}")]
    InvalidCell(String),

    /// Operation not permitted in the writer's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Archive or part could not be parsed on read-back
    #[error("Failed to read workbook: {0}")]
    ReadError(String),

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV encoder error wrapper
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl ExportError {
    pub(crate) fn create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::CreateError {
            path: path.into(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::ReadError(err.to_string())
    }
}
