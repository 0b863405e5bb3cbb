//! In-memory storage backend
//!
//! A map-based implementation used by tests, the in-process ledger, and the
//! JSON snapshot file. Persistence, when needed, is a serde round trip of the
//! whole struct.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Address, Attestation, Attestor, PeriodId, VerificationResult, VerificationRule,
};
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::traits::LedgerStore;

/// Per-period slice of ledger state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PeriodRecord {
    /// Submission order
    attestors: Vec<Address>,
    attestations: HashMap<Address, Attestation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<VerificationResult>,
}

/// In-memory ledger state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryLedger {
    admin: Address,
    required_attestor_count: usize,
    current_period: PeriodId,
    registry: Vec<Address>,
    attestors: HashMap<Address, Attestor>,
    rules: Vec<VerificationRule>,
    periods: BTreeMap<PeriodId, PeriodRecord>,
}

impl MemoryLedger {
    /// Create an empty ledger at period 0.
    pub fn new(admin: Address, required_attestor_count: usize) -> Self {
        Self {
            admin,
            required_attestor_count,
            current_period: 0,
            registry: Vec::new(),
            attestors: HashMap::new(),
            rules: Vec::new(),
            periods: BTreeMap::new(),
        }
    }

    /// Restore a ledger from its JSON snapshot.
    pub fn from_json(bytes: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Serialize the whole ledger for persistence.
    pub fn to_json(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl LedgerStore for MemoryLedger {
    fn admin(&self) -> &Address {
        &self.admin
    }

    fn required_attestor_count(&self) -> usize {
        self.required_attestor_count
    }

    fn insert_attestor(&mut self, attestor: Attestor) -> StoreResult<()> {
        if self.attestors.contains_key(&attestor.address) {
            return Err(StoreError::AlreadyExists(attestor.address.to_string()));
        }
        self.registry.push(attestor.address.clone());
        self.attestors.insert(attestor.address.clone(), attestor);
        Ok(())
    }

    fn attestor(&self, address: &Address) -> StoreResult<Option<Attestor>> {
        Ok(self.attestors.get(address).cloned())
    }

    fn attestor_addresses(&self) -> StoreResult<Vec<Address>> {
        Ok(self.registry.clone())
    }

    fn attestor_count(&self) -> StoreResult<usize> {
        Ok(self.registry.len())
    }

    fn insert_attestation(
        &mut self,
        period: PeriodId,
        attestation: Attestation,
    ) -> StoreResult<usize> {
        let record = self.periods.entry(period).or_default();
        if record.attestations.contains_key(&attestation.attestor) {
            return Err(StoreError::AlreadyExists(format!(
                "attestation {}@{}",
                attestation.attestor, period
            )));
        }
        record.attestors.push(attestation.attestor.clone());
        record
            .attestations
            .insert(attestation.attestor.clone(), attestation);
        Ok(record.attestors.len())
    }

    fn attestation(
        &self,
        period: PeriodId,
        attestor: &Address,
    ) -> StoreResult<Option<Attestation>> {
        Ok(self
            .periods
            .get(&period)
            .and_then(|record| record.attestations.get(attestor))
            .cloned())
    }

    fn period_attestors(&self, period: PeriodId) -> StoreResult<Vec<Address>> {
        Ok(self
            .periods
            .get(&period)
            .map(|record| record.attestors.clone())
            .unwrap_or_default())
    }

    fn period_attestor_count(&self, period: PeriodId) -> StoreResult<usize> {
        Ok(self
            .periods
            .get(&period)
            .map(|record| record.attestors.len())
            .unwrap_or(0))
    }

    fn push_rule(&mut self, rule: VerificationRule) -> StoreResult<usize> {
        self.rules.push(rule);
        Ok(self.rules.len() - 1)
    }

    fn rule(&self, index: usize) -> StoreResult<Option<VerificationRule>> {
        Ok(self.rules.get(index).cloned())
    }

    fn rule_count(&self) -> StoreResult<usize> {
        Ok(self.rules.len())
    }

    fn insert_result(&mut self, period: PeriodId, result: VerificationResult) -> StoreResult<()> {
        let record = self.periods.entry(period).or_default();
        if record.result.is_some() {
            return Err(StoreError::AlreadyExists(format!("result@{}", period)));
        }
        record.result = Some(result);
        Ok(())
    }

    fn result(&self, period: PeriodId) -> StoreResult<Option<VerificationResult>> {
        Ok(self
            .periods
            .get(&period)
            .and_then(|record| record.result.clone()))
    }

    fn current_period(&self) -> StoreResult<PeriodId> {
        Ok(self.current_period)
    }

    fn set_current_period(&mut self, period: PeriodId) -> StoreResult<()> {
        if period <= self.current_period {
            return Err(StoreError::InvalidData(format!(
                "period pointer may only move forward ({} -> {})",
                self.current_period, period
            )));
        }
        self.current_period = period;
        Ok(())
    }
}
