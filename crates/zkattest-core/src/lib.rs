//! zkattest Core Engine
//!
//! The coordination layer of the zkattest attestation protocol: designated
//! parties submit encrypted commitments per period, and once a quorum is in,
//! a verifier publishes a pass/fail result with proof bytes.
//!
//! This crate holds the authoritative state machine and is deliberately
//! synchronous. Ledger writes are assumed to be totally ordered by whatever
//! hosts the engine, so no internal locking is done here.
//!
//! # Modules
//!
//! - `model` - Attestors, attestations, rules, results
//! - `storage` - `LedgerStore` trait and the in-memory backend
//! - `engine` - `PeriodEngine` state machine, events and errors
//! - `validation` - Payload/proof size and label checks
//! - `clock` - Injectable time source
//!
//! # Example
//!
//! ```rust
//! use zkattest_core::{Address, EngineError, PeriodEngine};
//!
//! let admin = Address::new("admin");
//! let mut engine = PeriodEngine::genesis(admin.clone(), 2).unwrap();
//!
//! let stranger = Address::new("0xstranger");
//! let result = engine.submit_attestation(&stranger, vec![1]);
//! assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
//! ```

pub mod clock;
pub mod engine;
pub mod model;
pub mod storage;
pub mod validation;

// Re-export main types at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{EngineError, LedgerEvent, PeriodEngine, SubmissionReceipt};
pub use model::{
    Address, Attestation, Attestor, PeriodId, PeriodStatus, Timestamp, VerificationResult,
    VerificationRule,
};
pub use storage::{LedgerStore, MemoryLedger, StoreError, StoreResult};
