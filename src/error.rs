//! Error types for u-compare.
//!
//! Request-level failures are [`CompareError`]. Each variant maps to an
//! [`ErrorClass`] so a caller can tell a bad request apart from a fault in
//! this crate. Failures of optional result fields (charts, trend lines) have
//! their own error types in [`chart`](crate::chart) and
//! [`render`](crate::render) and never surface here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All request-level errors produced by u-compare operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// CSV parsing failed.
    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },
    /// The input contained no rows or no columns.
    #[error("file contains no data")]
    EmptyInput,
    /// The file extension is not one we can read.
    #[error("Unsupported file format: {filename}")]
    UnsupportedFormat { filename: String },
    /// The bytes could not be decoded with any supported text encoding.
    #[error("Could not read CSV file: {message}")]
    Decode { message: String },
    /// Reading a spreadsheet workbook failed.
    #[error("Failed to read workbook: {message}")]
    Workbook { message: String },
    /// A requested column does not exist in the table.
    #[error("Column '{name}' not found. Available: [{}]", quoted_list(.available))]
    ColumnNotFound { name: String, available: Vec<String> },
    /// Dimension mismatch.
    #[error("expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// A named input file is missing or not readable by this process.
    #[error("Cannot read '{path}': {message}")]
    Unreadable { path: String, message: String },
    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(String),
    /// Unexpected failure inside the engine.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Which side of the boundary an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request was malformed (4xx-equivalent).
    Client,
    /// The engine failed unexpectedly (5xx-equivalent).
    Server,
}

impl CompareError {
    /// Classifies the error as caller-facing or internal.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CsvParse { .. }
            | Self::EmptyInput
            | Self::UnsupportedFormat { .. }
            | Self::Decode { .. }
            | Self::Workbook { .. }
            | Self::ColumnNotFound { .. }
            | Self::DimensionMismatch { .. }
            | Self::Unreadable { .. } => ErrorClass::Client,
            Self::Io(_) | Self::Internal(_) => ErrorClass::Server,
        }
    }

    /// Returns `true` for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    /// Builds the structured body handed back to the caller.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            class: self.class(),
        }
    }
}

impl CompareError {
    /// Wraps a failure to read `path`. A missing file or a denied
    /// permission points at the caller's path and is [`Unreadable`];
    /// any other I/O failure stays [`Io`].
    ///
    /// [`Unreadable`]: CompareError::Unreadable
    /// [`Io`]: CompareError::Io
    pub fn reading(path: &std::path::Path, err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => Self::Unreadable {
                path: path.display().to_string(),
                message: err.to_string(),
            },
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CompareError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Structured error body returned at the outer boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Client or server fault.
    pub class: ErrorClass,
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
