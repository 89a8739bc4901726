//! Error types for the join-and-analyze pipeline.
//!
//! Schema problems are fatal for the whole run. Insufficient data is fatal
//! for the regression step only; the joined and eligible datasets are still
//! handed back to the caller. An identifier with no indicator match is not
//! an error at all.
//!
//! Errors serialize as `{code, message}` so they can be embedded in the JSON
//! summary artifact.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Why a regression could not be computed.
///
/// Kept separate from [`AnalysisError`] so it can be stored in the pipeline
/// output alongside the datasets that are still valid.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InsufficientData {
    /// Fewer than two eligible observations.
    #[error("need at least 2 eligible observations, found {n}")]
    TooFewObservations { n: usize },

    /// Every eligible observation has the same independent value.
    #[error("independent variable has zero variance across {n} observations")]
    ZeroVariance { n: usize },
}

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A required column is absent from an input table.
    #[error("Required column '{column}' not found in {table} table")]
    Schema { table: String, column: String },

    /// The eligible subset cannot support a regression.
    #[error("Insufficient data for regression: {0}")]
    DataInsufficient(#[from] InsufficientData),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ConfigValidationError),

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
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Missing-column error for the given table.
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        AnalysisError::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::DataInsufficient(_) => "DATA_INSUFFICIENT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this is a schema problem with one of the inputs.
    pub fn is_schema(&self) -> bool {
        match self {
            Self::Schema { .. } => true,
            Self::WithContext { source, .. } => source.is_schema(),
            _ => false,
        }
    }

    /// Whether only the regression step failed, leaving the datasets usable.
    pub fn is_data_insufficient(&self) -> bool {
        match self {
            Self::DataInsufficient(_) => true,
            Self::WithContext { source, .. } => source.is_data_insufficient(),
            _ => false,
        }
    }
}

impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

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
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}
