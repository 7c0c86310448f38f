//! Common error types for gdclient.

use thiserror::Error;

/// Top-level error type for gdclient operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Client configuration (credentials artifact) is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authorization or token exchange failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Transport failure or unexpected API status.
    #[error("Network error: {0}")]
    Network(String),

    /// Remote resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access to the remote resource was denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Backing store returned something the caller cannot use.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "token.json");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("token.json"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
