//! Service-level error type
//!
//! Covers the failures of process setup: configuration, binding the
//! listener, opening the document store. Request-time failures are
//! [`crate::handlers::ApiError`].

use thiserror::Error;

use crate::store::StorageError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or starting the service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration parsed but violates a constraint
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Document store could not be opened
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StorageErrorKind, StorageOperation};

    #[test]
    fn test_storage_error_passes_through_display() {
        let err: Error = StorageError::new(
            StorageOperation::Connect,
            StorageErrorKind::ConnectionFailed,
            "refused",
        )
        .into();
        assert_eq!(err.to_string(), "Storage connection_failed error during connect: refused");
    }

    #[test]
    fn test_invalid_config_display() {
        let err = Error::InvalidConfig("bad port".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: bad port");
    }
}
