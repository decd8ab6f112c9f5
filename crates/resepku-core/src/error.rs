//! Error types for the Resepku core
//!
//! Every operation exposed to the presentation layer returns either an
//! updated snapshot or one of these classified errors.

use thiserror::Error;

/// Result type alias for Resepku operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected by a field rule (e.g. empty username)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Avatar file exceeds the size limit
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Size of the rejected file
        size: usize,
        /// Maximum accepted size
        limit: usize,
    },

    /// Avatar file has a mime type other than PNG or JPEG
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    /// Transport failure talking to the favorites service
    #[error("Network error: {0}")]
    Network(String),

    /// Missing or rejected credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Recipe or resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Profile persistence failure (I/O, quota)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation not legal in the current edit state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Stable classification of an [`Error`], suitable for matching in UI code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    FileTooLarge,
    UnsupportedType,
    Network,
    Auth,
    NotFound,
    Storage,
    InvalidState,
    Config,
    Other,
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "file too large" error
    pub fn file_too_large(size: usize, limit: usize) -> Self {
        Self::FileTooLarge { size, limit }
    }

    /// Create an unsupported type error
    pub fn unsupported_type(mime_type: impl Into<String>) -> Self {
        Self::UnsupportedType(mime_type.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::Network(_) => ErrorKind::Network,
            Error::Auth(_) => ErrorKind::Auth,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Storage(_) | Error::Json(_) => ErrorKind::Storage,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::Config(_) => ErrorKind::Config,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the failure came from the transport or persistence layer
    /// rather than from user input
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Storage)
    }

    /// Short message the UI can show next to the failed control
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::FileTooLarge { limit, .. } => {
                format!("Maximum file size is {} MB", limit / (1024 * 1024))
            }
            Error::UnsupportedType(_) => "Only PNG and JPEG images are supported".to_string(),
            Error::Network(_) => "Could not reach the server. Please try again.".to_string(),
            Error::Auth(_) => "Your session has expired. Please sign in again.".to_string(),
            Error::NotFound(_) => "The recipe could not be found".to_string(),
            Error::Storage(_) | Error::Json(_) => "Could not save your changes".to_string(),
            Error::InvalidState(_) => "That action is not available right now".to_string(),
            Error::Config(msg) | Error::Other(msg) => msg.clone(),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(Error::file_too_large(3, 2).kind(), ErrorKind::FileTooLarge);
        assert_eq!(Error::auth("expired").kind(), ErrorKind::Auth);

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(json_err).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::network("timeout").is_transient());
        assert!(Error::storage("quota").is_transient());
        assert!(!Error::validation("empty").is_transient());
        assert!(!Error::auth("401").is_transient());
    }

    #[test]
    fn test_file_too_large_message() {
        let err = Error::file_too_large(2_097_153, 2_097_152);
        assert_eq!(err.user_message(), "Maximum file size is 2 MB");
        assert!(err.to_string().contains("2097153"));
    }
}
