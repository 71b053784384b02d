//! Error types for the diachi workspace.

use thiserror::Error;

/// Result type alias using diachi's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for diachi operations.
///
/// The parsing pipeline itself never surfaces these to callers; every
/// per-request failure is folded into a well-formed [`crate::ParseResult`].
/// This enum covers startup paths (pool creation, reference loading) and
/// collaborator boundaries (geocoder).
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reference data is missing or inconsistent at load time
    #[error("Reference store error: {0}")]
    Reference(String),

    /// External geocoder failed or returned an unusable response
    #[error("Geocoder error: {0}")]
    Geocoder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Geocoder(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_reference() {
        let err = Error::Reference("admin_divisions is empty".to_string());
        assert_eq!(
            err.to_string(),
            "Reference store error: admin_divisions is empty"
        );
    }

    #[test]
    fn test_error_display_geocoder() {
        let err = Error::Geocoder("timeout".to_string());
        assert_eq!(err.to_string(), "Geocoder error: timeout");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("ensemble weights must sum to 1.0".to_string());
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
