//! Error types for stockbook-core
//!
//! Argument errors surface to the caller; anything on the checkpoint
//! optimization path degrades silently (see the balance engine).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Validation error
    ValidationError,
    /// Reference item not found
    ReferenceNotFound,
    /// Unknown reference kind
    UnknownReferenceKind,
    /// Invalid data format
    InvalidFormat,
    /// IO error
    IoError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::ReferenceNotFound => write!(f, "REFERENCE_NOT_FOUND"),
            ErrorCode::UnknownReferenceKind => write!(f, "UNKNOWN_REFERENCE_KIND"),
            ErrorCode::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation may be affected
    Warning,
    /// Error - operation failed
    Error,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
        }
    }
}

/// Main error type for stockbook-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{kind} not found: {id}")]
    ReferenceNotFound { kind: String, id: String },

    #[error("Unknown reference kind: {kind}")]
    UnknownReferenceKind { kind: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("IO error occurred")]
    IoError,

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::ReferenceNotFound { .. } => ErrorCode::ReferenceNotFound,
            CoreError::UnknownReferenceKind { .. } => ErrorCode::UnknownReferenceKind,
            CoreError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            CoreError::IoError => ErrorCode::IoError,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::ValidationError { .. } => ErrorSeverity::Warning,
            CoreError::ReferenceNotFound { .. } => ErrorSeverity::Info,
            CoreError::UnknownReferenceKind { .. } => ErrorSeverity::Warning,
            CoreError::InvalidFormat { .. } => ErrorSeverity::Error,
            CoreError::IoError => ErrorSeverity::Error,
            CoreError::InternalError { .. } => ErrorSeverity::Error,
        }
    }

    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError { message: message.into() }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(_error: std::io::Error) -> Self {
        CoreError::IoError
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        CoreError::InvalidFormat {
            message: error.to_string(),
        }
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::ValidationError.to_string(), "VALIDATION_ERROR");
        assert_eq!(ErrorCode::ReferenceNotFound.to_string(), "REFERENCE_NOT_FOUND");
    }

    #[test]
    fn test_core_error_code_and_severity() {
        let error = CoreError::validation("start after end");
        assert_eq!(error.code(), ErrorCode::ValidationError);
        assert_eq!(error.severity(), ErrorSeverity::Warning);

        let error = CoreError::ReferenceNotFound {
            kind: "nomenclature".to_string(),
            id: "x".to_string(),
        };
        assert_eq!(error.code(), ErrorCode::ReferenceNotFound);
        assert_eq!(error.severity(), ErrorSeverity::Info);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: CoreError = io.into();
        assert_eq!(error.code(), ErrorCode::IoError);
    }
}
