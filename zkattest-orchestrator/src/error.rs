//! Orchestrator error types

use std::time::Duration;
use thiserror::Error;
use zkattest_core::{EngineError, PeriodId};

/// Failures of a single pipeline attempt.
///
/// None of these are fatal to the process: the attempt is abandoned, the
/// pipeline gate is released, and the next backlog scan retries the period.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Payload or proof file absent, unreadable, or not what was written
    #[error("artifact missing for period {period}: {detail}")]
    ArtifactMissing { period: PeriodId, detail: String },

    /// Prover exited non-zero or produced malformed output
    #[error("proving failed for period {period}: {detail}")]
    ProvingFailed { period: PeriodId, detail: String },

    #[error("proving timed out for period {period} after {timeout:?}")]
    Timeout { period: PeriodId, timeout: Duration },

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] EngineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl From<OrchestratorError> for zkattest::Error {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Ledger(e) => zkattest::Error::Ledger(e),
            OrchestratorError::Io(e) => zkattest::Error::Io(e),
            OrchestratorError::Config(message) => zkattest::Error::Config(message),
            other => zkattest::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_ledger_errors_typed() {
        let err: zkattest::Error =
            OrchestratorError::Ledger(EngineError::ResultAlreadyPublished(3)).into();
        assert!(matches!(
            err,
            zkattest::Error::Ledger(EngineError::ResultAlreadyPublished(3))
        ));

        let err: zkattest::Error = OrchestratorError::Timeout {
            period: 1,
            timeout: Duration::from_secs(30),
        }
        .into();
        assert_eq!(err.to_string(), "proving timed out for period 1 after 30s");
    }

    #[test]
    fn test_sub_second_timeout_display() {
        let err = OrchestratorError::Timeout {
            period: 2,
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "proving timed out for period 2 after 250ms");
    }
}
