//! Ledger access for the orchestrator.
//!
//! `LedgerClient` is the read-and-publish surface the proof pipeline needs.
//! `LocalLedger` hosts a `PeriodEngine` in-process: every call runs under one
//! mutex, which gives the engine the serialized execution it assumes, and
//! the events each call emits are fanned out on a broadcast channel.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use zkattest_core::{
    Address, Attestation, Attestor, EngineError, LedgerEvent, LedgerStore, MemoryLedger,
    PeriodEngine, PeriodId, SubmissionReceipt, VerificationResult,
};

/// Capacity of the in-process event channel before slow receivers lag.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Ledger operations consumed by the orchestrator.
///
/// Reads return absent values rather than errors; errors are storage or
/// transport failures, or the engine's rejection of a publish.
pub trait LedgerClient: Send + Sync {
    fn current_period(&self) -> Result<PeriodId, EngineError>;

    fn required_attestor_count(&self) -> Result<usize, EngineError>;

    /// Addresses that attested for `period`, in submission order.
    fn period_attestors(&self, period: PeriodId) -> Result<Vec<Address>, EngineError>;

    fn period_attestor_count(&self, period: PeriodId) -> Result<usize, EngineError> {
        Ok(self.period_attestors(period)?.len())
    }

    fn attestor_by_name(&self, name: &str) -> Result<Option<Attestor>, EngineError>;

    fn attestation(
        &self,
        period: PeriodId,
        attestor: &Address,
    ) -> Result<Option<Attestation>, EngineError>;

    fn verification_result(
        &self,
        period: PeriodId,
    ) -> Result<Option<VerificationResult>, EngineError>;

    /// Publish with the client's operator identity.
    fn publish_verification_result(
        &self,
        period: PeriodId,
        passed: bool,
        proof_data: Vec<u8>,
    ) -> Result<(), EngineError>;
}

/// In-process ledger shared between the submitters and the orchestrator.
#[derive(Clone)]
pub struct LocalLedger {
    engine: Arc<Mutex<PeriodEngine<MemoryLedger>>>,
    events: broadcast::Sender<LedgerEvent>,
    operator: Address,
}

impl LocalLedger {
    /// Wrap an engine; `operator` is the identity used for publishing.
    pub fn new(engine: PeriodEngine<MemoryLedger>, operator: Address) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            events,
            operator,
        }
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    pub fn operator(&self) -> &Address {
        &self.operator
    }

    /// Run a mutation against the engine and broadcast what it emitted.
    pub fn apply<T>(
        &self,
        op: impl FnOnce(&mut PeriodEngine<MemoryLedger>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let (result, events) = {
            let mut engine = self.engine.lock();
            let result = op(&mut engine);
            (result, engine.take_events())
        };
        for event in events {
            debug!(?event, "ledger event");
            // No receivers is fine; the backlog scan covers missed events.
            let _ = self.events.send(event);
        }
        result
    }

    /// Run a read against the engine.
    pub fn read<T>(&self, op: impl FnOnce(&PeriodEngine<MemoryLedger>) -> T) -> T {
        let engine = self.engine.lock();
        op(&engine)
    }

    pub fn register_attestor(
        &self,
        caller: &Address,
        address: Address,
        name: &str,
    ) -> Result<(), EngineError> {
        self.apply(|engine| engine.register_attestor(caller, address, name))
    }

    pub fn submit_attestation(
        &self,
        caller: &Address,
        payload: Vec<u8>,
    ) -> Result<SubmissionReceipt, EngineError> {
        self.apply(|engine| engine.submit_attestation(caller, payload))
    }

    pub fn submit_attestation_on_behalf(
        &self,
        caller: &Address,
        attestor: &Address,
        payload: Vec<u8>,
    ) -> Result<SubmissionReceipt, EngineError> {
        self.apply(|engine| engine.submit_attestation_on_behalf(caller, attestor, payload))
    }

    pub fn add_verification_rule(
        &self,
        caller: &Address,
        description: &str,
        rule_data: Vec<u8>,
    ) -> Result<usize, EngineError> {
        self.apply(|engine| engine.add_verification_rule(caller, description, rule_data))
    }

    pub fn force_advance_period(&self, caller: &Address) -> Result<PeriodId, EngineError> {
        self.apply(|engine| engine.force_advance_period(caller))
    }
}

impl LedgerClient for LocalLedger {
    fn current_period(&self) -> Result<PeriodId, EngineError> {
        self.read(|engine| engine.current_period())
    }

    fn required_attestor_count(&self) -> Result<usize, EngineError> {
        Ok(self.read(|engine| engine.store().required_attestor_count()))
    }

    fn period_attestors(&self, period: PeriodId) -> Result<Vec<Address>, EngineError> {
        self.read(|engine| engine.period_attestors(period))
    }

    fn period_attestor_count(&self, period: PeriodId) -> Result<usize, EngineError> {
        self.read(|engine| engine.period_attestor_count(period))
    }

    fn attestor_by_name(&self, name: &str) -> Result<Option<Attestor>, EngineError> {
        self.read(|engine| engine.attestor_by_name(name))
    }

    fn attestation(
        &self,
        period: PeriodId,
        attestor: &Address,
    ) -> Result<Option<Attestation>, EngineError> {
        self.read(|engine| engine.attestation(period, attestor))
    }

    fn verification_result(
        &self,
        period: PeriodId,
    ) -> Result<Option<VerificationResult>, EngineError> {
        self.read(|engine| engine.verification_result(period))
    }

    fn publish_verification_result(
        &self,
        period: PeriodId,
        passed: bool,
        proof_data: Vec<u8>,
    ) -> Result<(), EngineError> {
        let operator = self.operator.clone();
        self.apply(|engine| {
            engine.publish_verification_result(&operator, period, passed, proof_data)
        })
    }
}
