//! Ledger type definitions

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Period identifier. Periods start at 0 and increase without gaps.
pub type PeriodId = u64;

/// Unix timestamp in milliseconds.
pub type Timestamp = i64;

/// Ledger identity of a party (an account address or key fingerprint).
///
/// Immutable once registered; compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Address {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// A party allowed to submit attestations.
///
/// Registration is permanent; there is no revocation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestor {
    pub address: Address,

    /// Role name (e.g. "exchange", "regulator"), used by the orchestrator
    /// to pick which submissions feed the prover.
    pub name: String,

    pub registered: bool,

    /// When the administrator registered this attestor
    pub registered_at: Timestamp,
}

/// One attestor's encrypted commitment for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub attestor: Address,

    /// Opaque ciphertext produced by the encryption collaborator
    #[serde(with = "super::hex_bytes")]
    pub payload: Vec<u8>,

    pub submitted_at: Timestamp,
}

impl Attestation {
    pub fn new(attestor: Address, payload: Vec<u8>, submitted_at: Timestamp) -> Self {
        Self {
            attestor,
            payload,
            submitted_at,
        }
    }

    /// SHA-256 of the payload, hex encoded.
    pub fn payload_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.payload);
        hex::encode(hasher.finalize())
    }
}

/// An append-only verification rule, referenced by its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRule {
    pub description: String,

    #[serde(with = "super::hex_bytes")]
    pub rule_data: Vec<u8>,
}

/// Pass/fail outcome for a period plus the proof backing it.
///
/// At most one per period; never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: bool,

    #[serde(with = "super::hex_bytes")]
    pub proof_data: Vec<u8>,

    pub published_at: Timestamp,
}

/// Lifecycle position of a single period.
///
/// `QuorumReached` is an attribute of the attestation count, not a gate:
/// submissions are still accepted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Collecting attestations, below quorum
    Open,
    /// Quorum reached, no result published yet
    QuorumReached,
    /// Result published (terminal)
    Verified,
    /// Left behind by the period pointer without quorum
    Abandoned,
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeriodStatus::Open => "open",
            PeriodStatus::QuorumReached => "quorum_reached",
            PeriodStatus::Verified => "verified",
            PeriodStatus::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_digest_is_sha256_hex() {
        let attestation = Attestation::new(Address::new("a"), b"hello world".to_vec(), 1);
        assert_eq!(
            attestation.payload_digest(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_payload_serializes_as_hex() {
        let attestation = Attestation::new(Address::new("0xabc"), vec![0xde, 0xad], 7);
        let json = serde_json::to_value(&attestation).unwrap();
        assert_eq!(json["attestor"], "0xabc");
        assert_eq!(json["payload"], "dead");

        let back: Attestation = serde_json::from_value(json).unwrap();
        assert_eq!(back, attestation);
    }

    #[test]
    fn test_blank_address_is_empty() {
        assert!(Address::new("   ").is_empty());
        assert!(!Address::new("0x1").is_empty());
    }
}
