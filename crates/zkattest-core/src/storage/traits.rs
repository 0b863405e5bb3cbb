//! Storage trait definitions

use crate::model::{
    Address, Attestation, Attestor, PeriodId, VerificationResult, VerificationRule,
};
use crate::storage::error::StoreResult;

/// Ledger state backing the period engine.
///
/// Write methods enforce single-record uniqueness (`AlreadyExists`); the
/// authorization and quorum rules live in the engine.
pub trait LedgerStore {
    /// The single administrative authority.
    fn admin(&self) -> &Address;

    /// Quorum size, fixed when the ledger is created.
    fn required_attestor_count(&self) -> usize;

    /// Register an attestor, preserving registration order.
    fn insert_attestor(&mut self, attestor: Attestor) -> StoreResult<()>;

    fn attestor(&self, address: &Address) -> StoreResult<Option<Attestor>>;

    /// Registered addresses in registration order.
    fn attestor_addresses(&self) -> StoreResult<Vec<Address>>;

    fn attestor_count(&self) -> StoreResult<usize> {
        Ok(self.attestor_addresses()?.len())
    }

    /// Record an attestation for a period.
    ///
    /// Returns the period's distinct attestor count after the insert.
    /// An existing attestation for (period, attestor) yields `AlreadyExists`.
    fn insert_attestation(&mut self, period: PeriodId, attestation: Attestation)
        -> StoreResult<usize>;

    fn attestation(&self, period: PeriodId, attestor: &Address)
        -> StoreResult<Option<Attestation>>;

    /// Attestors that submitted for a period, in submission order.
    fn period_attestors(&self, period: PeriodId) -> StoreResult<Vec<Address>>;

    fn period_attestor_count(&self, period: PeriodId) -> StoreResult<usize> {
        Ok(self.period_attestors(period)?.len())
    }

    /// Append a rule, returning its index.
    fn push_rule(&mut self, rule: VerificationRule) -> StoreResult<usize>;

    fn rule(&self, index: usize) -> StoreResult<Option<VerificationRule>>;

    fn rule_count(&self) -> StoreResult<usize>;

    /// Store a period's result. A second insert yields `AlreadyExists`.
    fn insert_result(&mut self, period: PeriodId, result: VerificationResult) -> StoreResult<()>;

    fn result(&self, period: PeriodId) -> StoreResult<Option<VerificationResult>>;

    fn current_period(&self) -> StoreResult<PeriodId>;

    /// Move the period pointer. Rejects anything but a forward move.
    fn set_current_period(&mut self, period: PeriodId) -> StoreResult<()>;
}
