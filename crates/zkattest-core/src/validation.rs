//! Input validation shared by the engine and its callers.
//!
//! Payloads and proofs are opaque; only presence and size are checked.

use crate::engine::EngineError;

/// Upper bound on an attestation payload or rule blob.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Upper bound on proof bytes attached to a verification result.
pub const MAX_PROOF_BYTES: usize = 4 * 1024 * 1024;

/// Reject empty or oversized blobs.
pub fn validate_blob(what: &str, bytes: &[u8], max: usize) -> Result<(), EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::InvalidInput(format!("{} must not be empty", what)));
    }
    validate_blob_size(what, bytes, max)
}

/// Size check only; empty blobs pass.
pub fn validate_blob_size(what: &str, bytes: &[u8], max: usize) -> Result<(), EngineError> {
    if bytes.len() > max {
        return Err(EngineError::InvalidInput(format!(
            "{} is {} bytes, limit is {}",
            what,
            bytes.len(),
            max
        )));
    }
    Ok(())
}

/// Reject blank names and descriptions.
pub fn validate_label(what: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{} must not be blank", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_blob() {
        assert!(validate_blob("payload", &[1], 4).is_ok());
        assert!(matches!(
            validate_blob("payload", &[], 4),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_blob("payload", &[0; 5], 4),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_blob_size_allows_empty() {
        assert!(validate_blob_size("rule data", &[], 4).is_ok());
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("name", "exchange").is_ok());
        assert!(validate_label("name", "  \t").is_err());
    }
}
