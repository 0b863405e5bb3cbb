//! Ledger data model - attestors, attestations, rules and results
//!
//! An attestation is an opaque encrypted commitment submitted by a registered
//! attestor for one period. Once enough distinct attestors have submitted, a
//! verification result is published for that period alongside proof bytes.
//!
//! # Example
//!
//! ```rust
//! use zkattest_core::model::{Address, Attestation};
//!
//! let attestation = Attestation::new(Address::new("0xexchange"), vec![1, 2, 3], 1704067200000);
//!
//! assert_eq!(attestation.attestor.as_str(), "0xexchange");
//! assert_eq!(attestation.payload_digest().len(), 64);
//! ```

mod hex_bytes;
mod types;

pub use types::{
    Address, Attestation, Attestor, PeriodId, PeriodStatus, Timestamp, VerificationResult,
    VerificationRule,
};
