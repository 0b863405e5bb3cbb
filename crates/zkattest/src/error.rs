//! Common error types for zkattest components.

use thiserror::Error;
use zkattest_core::EngineError;

/// Common error type for zkattest operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger rejected an operation
    #[error("ledger error: {0}")]
    Ledger(#[from] EngineError),

    /// Internal error
    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Result type alias using zkattest Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use zkattest_core::Address;

    #[test]
    fn test_ledger_error_display() {
        let err: Error = EngineError::AlreadyRegistered(Address::new("0xa")).into();
        assert_eq!(err.to_string(), "ledger error: attestor already registered: 0xa");
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            Error::config("roles must not be empty").to_string(),
            "configuration error: roles must not be empty"
        );
    }
}
