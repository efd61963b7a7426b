//! Error types for profiling runs.

use thiserror::Error;

use crate::frame::BackendKind;

/// Result type for profiling operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors that can occur while profiling a table.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Invalid settings or parameters.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The configured duplicates key is already a column of the table.
    #[error(
        "Duplicates key '{key}' is already a column of the table; rename the column or \
         change `duplicates.key`"
    )]
    DuplicateKeyCollision { key: String },

    /// The requested statistic exists but this backend cannot compute it.
    #[error("{feature} is not implemented for the {backend} backend")]
    NotImplemented {
        feature: String,
        backend: BackendKind,
    },

    /// No implementation is registered for the (operation, backend) pair.
    #[error("No '{operation}' implementation registered for the {backend} backend")]
    UnregisteredBackend {
        operation: String,
        backend: BackendKind,
    },

    /// A backend implementation received a column of another backend.
    #[error("Expected a {expected} column, got a {actual} column")]
    BackendMismatch {
        expected: BackendKind,
        actual: BackendKind,
    },

    /// The column is not part of the frame.
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    /// DataFusion query execution error.
    #[cfg(feature = "lazy")]
    #[error("Query execution failed: {0}")]
    QueryExecution(#[from] datafusion::error::DataFusionError),

    /// Arrow computation error.
    #[error("Arrow computation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Data type mismatch or invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A partition task could not be joined.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProfileError {
    /// Creates an invalid configuration error with the given message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an invalid data error with the given message.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Creates a not-implemented error for `feature` on `backend`.
    pub fn not_implemented(feature: impl Into<String>, backend: BackendKind) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
            backend,
        }
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Returns true if the error reports a missing backend capability.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProfileError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Execution(err.to_string())
    }
}
