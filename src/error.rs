//! s3browse Error Types

use thiserror::Error;

/// Result type alias for s3browse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by callers to branch on
/// the failure without inspecting messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidLocation,
    MissingParameter,
    InvalidParameter,
    BackendUnavailable,
    Config,
    Internal,
}

/// s3browse error types
#[derive(Error, Debug)]
pub enum Error {
    // Request errors
    #[error("Invalid location '{input}': {reason}")]
    InvalidLocation { input: String, reason: String },

    #[error("Missing required parameter: {field}")]
    MissingParameter { field: &'static str },

    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    // Storage errors
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an `InvalidLocation` error for the given raw input
    pub fn invalid_location(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidLocation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidLocation { .. } => ErrorKind::InvalidLocation,
            Error::MissingParameter { .. } => ErrorKind::MissingParameter,
            Error::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Error::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Error::Config(_) | Error::ConfigParse(_) => ErrorKind::Config,
            Error::Network(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    /// The request field a user error refers to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Error::InvalidLocation { .. } => Some("path"),
            Error::MissingParameter { field } | Error::InvalidParameter { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Check if this error was caused by caller input that must be
    /// corrected before trying again
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidLocation | ErrorKind::MissingParameter | ErrorKind::InvalidParameter
        )
    }

    /// Check if repeating the identical request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendUnavailable(_) | Error::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_not_retryable() {
        let err = Error::MissingParameter { field: "region" };
        assert!(err.is_user_error());
        assert!(!err.is_retryable());
        assert_eq!(err.field(), Some("region"));

        let err = Error::invalid_location("s3://", "missing bucket");
        assert_eq!(err.kind(), ErrorKind::InvalidLocation);
        assert_eq!(err.field(), Some("path"));
    }

    #[test]
    fn test_backend_errors_are_retryable() {
        let err = Error::BackendUnavailable("AccessDenied".into());
        assert!(!err.is_user_error());
        assert!(err.is_retryable());
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "Storage backend unavailable: AccessDenied");
    }
}
