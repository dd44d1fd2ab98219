//! Error types for the analytics and reconciliation engine.
//!
//! Only real failures live here. Expected "nothing to show" outcomes (an
//! all-null column, a dataset with a single numeric column, a column type
//! without a distribution) are modelled as variants of the result types
//! instead, so callers never have to inspect an error to tell a crash from an
//! empty answer.
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so an API layer can
//! forward them unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the insight engine.
#[derive(Error, Debug)]
pub enum InsightError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A reconciliation key column is absent from one of the datasets.
    #[error("Key column '{column}' not found in dataset '{dataset}'")]
    KeyColumnMissing { column: String, dataset: String },

    /// A requested comparison column is absent from one of the datasets.
    #[error("Comparison column '{column}' not found in dataset '{dataset}'")]
    ComparisonColumnMissing { column: String, dataset: String },

    /// The input format cannot be loaded.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A caller-supplied argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested sheet does not exist in the workbook.
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    /// Requested session does not exist (or was evicted).
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// The dataset violates a structural assumption (e.g. ragged columns).
    #[error("Malformed dataset during {operation}: {reason}")]
    MalformedDataset { operation: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InsightError>,
    },
}

impl InsightError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InsightError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::KeyColumnMissing { .. } => "KEY_COLUMN_MISSING",
            Self::ComparisonColumnMissing { .. } => "COMPARISON_COLUMN_MISSING",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::SheetNotFound(_) => "SHEET_NOT_FOUND",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::MalformedDataset { .. } => "MALFORMED_DATASET",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by caller input (bad identifier,
    /// argument or format) rather than an internal failure.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::KeyColumnMissing { .. }
            | Self::ComparisonColumnMissing { .. }
            | Self::UnsupportedFormat(_)
            | Self::InvalidArgument(_)
            | Self::InvalidConfig(_)
            | Self::SheetNotFound(_)
            | Self::SessionNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for InsightError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        InsightError::InvalidConfig(err.to_string())
    }
}

impl Serialize for InsightError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InsightError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, InsightError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InsightError::Polars(e).with_context(context))
    }
}
