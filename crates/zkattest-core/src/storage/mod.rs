//! Ledger state storage
//!
//! The `LedgerStore` trait abstracts the consensus-ordered store the period
//! engine runs against. Implementations exist for:
//!
//! - **Memory**: In-memory state (`MemoryLedger`), serializable to JSON so a
//!   single process can snapshot it to disk
//!
//! The engine applies one mutation at a time; stores never observe concurrent
//! writers and do no locking of their own.
//!
//! # Example
//!
//! ```rust
//! use zkattest_core::model::{Address, Attestation};
//! use zkattest_core::storage::{LedgerStore, MemoryLedger};
//!
//! let mut store = MemoryLedger::new(Address::new("admin"), 2);
//!
//! let count = store
//!     .insert_attestation(0, Attestation::new(Address::new("0xa"), vec![1], 10))
//!     .unwrap();
//! assert_eq!(count, 1);
//! assert!(store.attestation(0, &Address::new("0xa")).unwrap().is_some());
//! ```

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryLedger;
pub use traits::LedgerStore;
