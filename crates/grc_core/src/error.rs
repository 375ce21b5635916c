//! Core error types for grctool.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Validation error
    Validation { field: String, reason: String },

    /// Not found
    NotFound { kind: String, id: String },

    /// I/O failure
    Io {
        /// Operation that failed
        operation: String,
        /// Underlying error text
        message: String,
    },
}

impl CoreError {
    /// Build an I/O error from a `std::io::Error` and the operation that failed
    #[must_use]
    pub fn io(operation: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Short stable name of the variant, used in logs and error details
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } => "io",
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, reason } => {
                write!(f, "Validation failed for {}: {}", field, reason)
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            Self::Io { operation, message } => write!(f, "I/O error during {}: {}", operation, message),
        }
    }
}

impl std::error::Error for CoreError {}
