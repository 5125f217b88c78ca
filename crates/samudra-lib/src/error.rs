use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::stages::StageError;

/// Convenient result alias for the Samudra pipeline library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more required request parameters were absent.
    #[error("missing parameters: {}", .missing.join(", "))]
    MissingParameters { missing: Vec<String> },

    /// A request parameter was present but outside its accepted domain.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// An artifact name that is not a plain file name was handed to staging.
    #[error("invalid artifact name '{name}': artifact names must be plain file names")]
    InvalidArtifactName { name: String },

    /// An external engine failed; see [`StageError`] for the classification.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Required artifacts were not present after the computing stage.
    #[error("route calculation failed; output files not found: {}", .missing.join(", "))]
    IncompleteOutput { missing: Vec<String> },

    /// Smoothing parameters violate the filter contract.
    #[error("invalid smoothing parameters: {message}")]
    SmoothingConfig { message: String },

    /// Pipeline configuration could not be resolved.
    #[error("invalid pipeline configuration: {message}")]
    Config { message: String },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the pipeline workspace")]
    ProjectDirsUnavailable,

    /// Raised when a route would be constructed without any waypoints.
    #[error("route {objective} has no waypoints")]
    EmptyRoute { objective: String },

    /// Raised when a route file contains a row that is not a coordinate pair.
    #[error("malformed route file {path} at row {row}: {message}")]
    RouteFormat {
        path: PathBuf,
        row: usize,
        message: String,
    },

    /// Filesystem operation failed for a specific path.
    #[error("failed to {operation} {path}: {source}")]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Wrapper for JSON errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of [`Error`] used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid request parameters.
    Validation,
    /// An engine rejected its parameters.
    EngineInput,
    /// Required artifacts were missing after the engines ran.
    IncompleteOutput,
    /// A filesystem operation failed.
    Io,
    /// Invalid smoothing parameters or configuration.
    Config,
    /// An engine crashed or produced something unusable.
    Internal,
}

impl ErrorKind {
    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::EngineInput)
    }

    /// Stable label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::EngineInput => "engine_input_error",
            ErrorKind::IncompleteOutput => "incomplete_output",
            ErrorKind::Io => "io_error",
            ErrorKind::Config => "config_error",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingParameters { .. }
            | Error::InvalidParameter { .. }
            | Error::InvalidArtifactName { .. } => ErrorKind::Validation,
            Error::Stage(StageError::InvalidInput { .. }) => ErrorKind::EngineInput,
            Error::Stage(StageError::InternalFailure { .. }) => ErrorKind::Internal,
            Error::IncompleteOutput { .. } => ErrorKind::IncompleteOutput,
            Error::SmoothingConfig { .. }
            | Error::Config { .. }
            | Error::ProjectDirsUnavailable => ErrorKind::Config,
            Error::Filesystem { .. } | Error::Io(_) => ErrorKind::Io,
            Error::EmptyRoute { .. }
            | Error::RouteFormat { .. }
            | Error::Csv(_)
            | Error::Json(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }
}
