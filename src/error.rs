//! Error types for warmpath.
//!
//! All errors are strongly typed using thiserror. Callers can pattern match
//! on the three failure classes the engine surfaces: invalid input, a record
//! that does not resolve, and a failure inside the storage collaborator.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::storage::StorageError;

/// Validation errors raised before any traversal or matching begins.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_hops must be at least 1, got {value}")]
    MaxHopsOutOfRange {
        value: usize,
    },

    #[error("min_strength {value} is out of range [0.0, 1.0]")]
    MinStrengthOutOfRange {
        value: f64,
    },

    #[error("max_results must be at least 1")]
    MaxResultsZero,

    #[error("Strength weights must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne {
        sum: f64,
    },

    #[error("Weight '{name}' must be a finite non-negative number, got {value}")]
    WeightOutOfRange {
        name: &'static str,
        value: f64,
    },

    #[error("Name and organization weights must sum to 1.0, got {sum}")]
    MatchWeightsDoNotSumToOne {
        sum: f64,
    },

    #[error("recent_window_days must be in [0, {max}], got {value}")]
    RecentWindowOutOfRange {
        value: i64,
        max: i64,
    },

    #[error("Threshold '{name}' = {value} is out of range [0.0, 1.0]")]
    InvalidThreshold {
        name: &'static str,
        value: f64,
    },

    #[error("Path has no nodes")]
    EmptyPath,

    #[error("Malformed path: {reason}")]
    MalformedPath {
        reason: String,
    },
}

/// Kind of record that failed to resolve.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Person,
    Organization,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "Person"),
            Self::Organization => write!(f, "Organization"),
        }
    }
}

/// Top-level error type for warmpath.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum WarmpathError {
    /// Options, configuration or a path failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The id does not resolve to an existing, non-deleted record.
    #[error("{kind} not found: {id} (during {operation})")]
    NotFound {
        kind: RecordKind,
        id: String,
        operation: &'static str,
    },

    /// The storage collaborator failed. The underlying error is kept as-is.
    #[error("Storage failure during {operation}: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller cancelled the operation.
    #[error("Operation '{operation}' was cancelled")]
    Cancelled {
        operation: &'static str,
    },

    /// An invariant of the engine itself was broken.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl WarmpathError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a person id.
    #[must_use]
    pub fn person_not_found(id: impl fmt::Display, operation: &'static str) -> Self {
        Self::NotFound {
            kind: RecordKind::Person,
            id: id.to_string(),
            operation,
        }
    }

    /// Returns a mapper that wraps a storage failure with the operation that hit it.
    ///
    /// ```rust,ignore
    /// let edges = store
    ///     .get_outgoing_edges(id)
    ///     .map_err(WarmpathError::storage("find_paths"))?;
    /// ```
    pub fn storage(operation: &'static str) -> impl FnOnce(StorageError) -> Self {
        move |source| {
            warn!(operation, error = %source, "storage collaborator failed");
            Self::Storage { operation, source }
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if a record did not resolve.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the storage collaborator failed.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns true if the caller may retry the same request.
    ///
    /// The engine never retries on its own; this only classifies the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                source: StorageError::ConnectionError(_) | StorageError::Timeout { .. },
                ..
            }
        )
    }
}

/// Result type alias for warmpath operations.
pub type WarmpathResult<T> = Result<T, WarmpathError>;
