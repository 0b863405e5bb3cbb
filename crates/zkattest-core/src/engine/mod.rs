//! Attestation registry and period state machine
//!
//! `PeriodEngine` is the authoritative rule set over a `LedgerStore`:
//! attestor registration, per-period submission with quorum detection,
//! verification-result publication, and period rollover.
//!
//! A single period moves `Open → QuorumReached → Verified`, or
//! `Open → Abandoned` when the administrator forces the pointer past it.
//!
//! # Example
//!
//! ```rust
//! use zkattest_core::engine::{LedgerEvent, PeriodEngine};
//! use zkattest_core::model::Address;
//!
//! let admin = Address::new("admin");
//! let exchange = Address::new("0xexchange");
//! let regulator = Address::new("0xregulator");
//!
//! let mut engine = PeriodEngine::genesis(admin.clone(), 2).unwrap();
//! engine.register_attestor(&admin, exchange.clone(), "exchange").unwrap();
//! engine.register_attestor(&admin, regulator.clone(), "regulator").unwrap();
//!
//! engine.submit_attestation(&exchange, vec![1]).unwrap();
//! let receipt = engine.submit_attestation(&regulator, vec![2]).unwrap();
//! assert!(receipt.quorum_reached);
//!
//! engine.publish_verification_result(&admin, 0, true, vec![0xff]).unwrap();
//! assert_eq!(engine.current_period().unwrap(), 1);
//! assert!(engine
//!     .take_events()
//!     .contains(&LedgerEvent::PeriodQuorumReached { period: 0, count: 2 }));
//! ```

mod error;
mod events;

pub use error::EngineError;
pub use events::LedgerEvent;

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::model::{
    Address, Attestation, Attestor, PeriodId, PeriodStatus, VerificationResult, VerificationRule,
};
use crate::storage::{LedgerStore, MemoryLedger, StoreError};
use crate::validation::{
    validate_blob, validate_blob_size, validate_label, MAX_PAYLOAD_BYTES, MAX_PROOF_BYTES,
};

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub period: PeriodId,
    pub timestamp: i64,
    /// Distinct attestors for the period after this submission
    pub attestor_count: usize,
    /// True only for the submission that crossed the quorum threshold
    pub quorum_reached: bool,
}

/// The period state machine.
///
/// Every mutating method takes the caller identity explicitly and either
/// applies fully or returns an error without touching state. Events from
/// successful calls accumulate until drained with [`PeriodEngine::take_events`].
pub struct PeriodEngine<S: LedgerStore> {
    store: S,
    clock: Arc<dyn Clock>,
    events: Vec<LedgerEvent>,
}

impl PeriodEngine<MemoryLedger> {
    /// Fresh in-memory ledger at period 0 using the wall clock.
    pub fn genesis(admin: Address, required_attestor_count: usize) -> Result<Self, EngineError> {
        Self::genesis_with_clock(admin, required_attestor_count, Arc::new(SystemClock))
    }

    pub fn genesis_with_clock(
        admin: Address,
        required_attestor_count: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        if admin.is_empty() {
            return Err(EngineError::InvalidInput(
                "administrator address must not be blank".to_string(),
            ));
        }
        if required_attestor_count == 0 {
            return Err(EngineError::InvalidInput(
                "required attestor count must be at least 1".to_string(),
            ));
        }
        Ok(Self::new(
            MemoryLedger::new(admin, required_attestor_count),
            clock,
        ))
    }
}

impl<S: LedgerStore> PeriodEngine<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Register an attestor (administrator only).
    pub fn register_attestor(
        &mut self,
        caller: &Address,
        address: Address,
        name: &str,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "register attestors")?;
        if address.is_empty() {
            return Err(EngineError::InvalidInput(
                "attestor address must not be blank".to_string(),
            ));
        }
        validate_label("attestor name", name)?;

        if self.store.attestor(&address)?.is_some() {
            return Err(EngineError::AlreadyRegistered(address));
        }

        let attestor = Attestor {
            address: address.clone(),
            name: name.to_string(),
            registered: true,
            registered_at: self.clock.now_millis(),
        };
        self.store.insert_attestor(attestor).map_err(|e| match e {
            StoreError::AlreadyExists(_) => EngineError::AlreadyRegistered(address.clone()),
            other => other.into(),
        })?;

        self.events.push(LedgerEvent::AttestorRegistered {
            attestor: address,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Submit the caller's attestation for the current period.
    pub fn submit_attestation(
        &mut self,
        caller: &Address,
        payload: Vec<u8>,
    ) -> Result<SubmissionReceipt, EngineError> {
        if !self.is_registered(caller)? {
            return Err(EngineError::Unauthorized {
                caller: caller.clone(),
                action: "submit attestations",
            });
        }
        self.record_attestation(caller.clone(), payload)
    }

    /// Submit on behalf of a registered attestor (administrator only).
    ///
    /// Same duplicate and quorum rules as a direct submission.
    pub fn submit_attestation_on_behalf(
        &mut self,
        caller: &Address,
        attestor: &Address,
        payload: Vec<u8>,
    ) -> Result<SubmissionReceipt, EngineError> {
        self.require_admin(caller, "submit on behalf of attestors")?;
        if !self.is_registered(attestor)? {
            return Err(EngineError::Unauthorized {
                caller: attestor.clone(),
                action: "submit attestations",
            });
        }
        self.record_attestation(attestor.clone(), payload)
    }

    /// Append a verification rule (administrator only). Returns its index.
    pub fn add_verification_rule(
        &mut self,
        caller: &Address,
        description: &str,
        rule_data: Vec<u8>,
    ) -> Result<usize, EngineError> {
        self.require_admin(caller, "add verification rules")?;
        validate_label("rule description", description)?;
        validate_blob_size("rule data", &rule_data, MAX_PAYLOAD_BYTES)?;

        let index = self.store.push_rule(VerificationRule {
            description: description.to_string(),
            rule_data,
        })?;

        self.events.push(LedgerEvent::VerificationRuleAdded {
            index,
            description: description.to_string(),
        });
        Ok(index)
    }

    /// Publish the verification result for a period (administrator only).
    ///
    /// Advances the period pointer only when `period` is the current period;
    /// a result for an already-superseded period is recorded without moving it.
    pub fn publish_verification_result(
        &mut self,
        caller: &Address,
        period: PeriodId,
        passed: bool,
        proof_data: Vec<u8>,
    ) -> Result<(), EngineError> {
        self.require_admin(caller, "publish verification results")?;
        validate_blob("proof data", &proof_data, MAX_PROOF_BYTES)?;

        let count = self.store.period_attestor_count(period)?;
        let required = self.store.required_attestor_count();
        if count < required {
            return Err(EngineError::PeriodNotComplete {
                period,
                count,
                required,
            });
        }
        if self.store.result(period)?.is_some() {
            return Err(EngineError::ResultAlreadyPublished(period));
        }

        let timestamp = self.clock.now_millis();
        self.store
            .insert_result(
                period,
                VerificationResult {
                    passed,
                    proof_data,
                    published_at: timestamp,
                },
            )
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => EngineError::ResultAlreadyPublished(period),
                other => other.into(),
            })?;

        self.events.push(LedgerEvent::VerificationPublished {
            period,
            passed,
            timestamp,
        });

        let current = self.store.current_period()?;
        if period == current {
            self.advance(current, false)?;
        }
        Ok(())
    }

    /// Move the pointer past a period that will never reach quorum
    /// (administrator only). Returns the new current period.
    pub fn force_advance_period(&mut self, caller: &Address) -> Result<PeriodId, EngineError> {
        self.require_admin(caller, "force period advancement")?;
        let current = self.store.current_period()?;
        self.advance(current, true)
    }

    // ------------------------------------------------------------------
    // Queries (absent values, never errors beyond storage failures)
    // ------------------------------------------------------------------

    pub fn admin(&self) -> &Address {
        self.store.admin()
    }

    pub fn required_attestor_count(&self) -> usize {
        self.store.required_attestor_count()
    }

    pub fn current_period(&self) -> Result<PeriodId, EngineError> {
        Ok(self.store.current_period()?)
    }

    pub fn attestor_count(&self) -> Result<usize, EngineError> {
        Ok(self.store.attestor_count()?)
    }

    /// Registered attestors in registration order.
    pub fn attestors(&self) -> Result<Vec<Attestor>, EngineError> {
        let mut attestors = Vec::new();
        for address in self.store.attestor_addresses()? {
            if let Some(attestor) = self.store.attestor(&address)? {
                attestors.push(attestor);
            }
        }
        Ok(attestors)
    }

    pub fn attestor(&self, address: &Address) -> Result<Option<Attestor>, EngineError> {
        Ok(self.store.attestor(address)?)
    }

    /// First attestor registered under `name`.
    pub fn attestor_by_name(&self, name: &str) -> Result<Option<Attestor>, EngineError> {
        Ok(self.attestors()?.into_iter().find(|a| a.name == name))
    }

    pub fn period_attestor_count(&self, period: PeriodId) -> Result<usize, EngineError> {
        Ok(self.store.period_attestor_count(period)?)
    }

    pub fn period_attestors(&self, period: PeriodId) -> Result<Vec<Address>, EngineError> {
        Ok(self.store.period_attestors(period)?)
    }

    pub fn rule_count(&self) -> Result<usize, EngineError> {
        Ok(self.store.rule_count()?)
    }

    pub fn rule(&self, index: usize) -> Result<Option<VerificationRule>, EngineError> {
        Ok(self.store.rule(index)?)
    }

    pub fn attestation(
        &self,
        period: PeriodId,
        attestor: &Address,
    ) -> Result<Option<Attestation>, EngineError> {
        Ok(self.store.attestation(period, attestor)?)
    }

    pub fn verification_result(
        &self,
        period: PeriodId,
    ) -> Result<Option<VerificationResult>, EngineError> {
        Ok(self.store.result(period)?)
    }

    pub fn period_status(&self, period: PeriodId) -> Result<PeriodStatus, EngineError> {
        if self.store.result(period)?.is_some() {
            return Ok(PeriodStatus::Verified);
        }
        if self.store.period_attestor_count(period)? >= self.store.required_attestor_count() {
            return Ok(PeriodStatus::QuorumReached);
        }
        if period < self.store.current_period()? {
            return Ok(PeriodStatus::Abandoned);
        }
        Ok(PeriodStatus::Open)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require_admin(&self, caller: &Address, action: &'static str) -> Result<(), EngineError> {
        if caller != self.store.admin() {
            return Err(EngineError::Unauthorized {
                caller: caller.clone(),
                action,
            });
        }
        Ok(())
    }

    fn is_registered(&self, address: &Address) -> Result<bool, EngineError> {
        Ok(self
            .store
            .attestor(address)?
            .map(|a| a.registered)
            .unwrap_or(false))
    }

    fn record_attestation(
        &mut self,
        attestor: Address,
        payload: Vec<u8>,
    ) -> Result<SubmissionReceipt, EngineError> {
        validate_blob("attestation payload", &payload, MAX_PAYLOAD_BYTES)?;

        let period = self.store.current_period()?;
        if self.store.attestation(period, &attestor)?.is_some() {
            return Err(EngineError::DuplicateSubmission { period, attestor });
        }

        let timestamp = self.clock.now_millis();
        let count = self
            .store
            .insert_attestation(
                period,
                Attestation::new(attestor.clone(), payload, timestamp),
            )
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => EngineError::DuplicateSubmission {
                    period,
                    attestor: attestor.clone(),
                },
                other => other.into(),
            })?;

        self.events.push(LedgerEvent::AttestationRecorded {
            period,
            attestor,
            timestamp,
        });

        // Counts grow by exactly one per accepted submission, so equality
        // marks the single crossing.
        let quorum_reached = count == self.store.required_attestor_count();
        if quorum_reached {
            self.events
                .push(LedgerEvent::PeriodQuorumReached { period, count });
        }

        Ok(SubmissionReceipt {
            period,
            timestamp,
            attestor_count: count,
            quorum_reached,
        })
    }

    fn advance(&mut self, from: PeriodId, forced: bool) -> Result<PeriodId, EngineError> {
        let to = from
            .checked_add(1)
            .ok_or_else(|| EngineError::InvalidInput("period id overflow".to_string()))?;
        self.store.set_current_period(to)?;
        self.events
            .push(LedgerEvent::PeriodAdvanced { from, to, forced });
        Ok(to)
    }
}

impl<S: LedgerStore + std::fmt::Debug> std::fmt::Debug for PeriodEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodEngine")
            .field("store", &self.store)
            .field("pending_events", &self.events.len())
            .finish()
    }
}
