//! Proof pipeline.
//!
//! One idempotent pipeline per period, reachable from two entry points: the
//! ledger event stream (`handle_event`) and the backlog scan
//! (`reconcile_backlog`). A single-permit semaphore admits at most one
//! pipeline at a time; a trigger that finds it taken is dropped and left to
//! the next scan.
//!
//! ```text
//! trigger ──▶ gate ──▶ result exists? ──▶ quorum? ──▶ retrieve ──▶ prove ──▶ publish
//!              │            │                │
//!              ▼            ▼                ▼
//!            Busy    AlreadyPublished   NotEligible
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};
use zkattest::tracing::prefix;
use zkattest_core::{Address, EngineError, LedgerEvent, PeriodId};

use crate::artifacts::{check_labels, ArtifactStore};
use crate::error::{OrchestratorError, Result};
use crate::ledger::LedgerClient;
use crate::prover::{ProofRequest, Prover};

/// How a pipeline attempt ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// This attempt proved and published the result
    Published { passed: bool },
    /// A result already existed, or another publisher won the race
    AlreadyPublished,
    /// Another pipeline held the gate; the trigger was dropped
    Busy,
    /// The period has not reached quorum
    NotEligible,
}

/// Summary of one backlog pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Periods examined, `0..=current`
    pub scanned: usize,
    /// Periods published by this pass
    pub published: Vec<PeriodId>,
    /// Periods whose pipeline failed; retried on the next pass
    pub failed: Vec<PeriodId>,
    /// The pass stopped early because another pipeline held the gate
    pub interrupted: bool,
}

/// Drives proof generation for periods that reached quorum.
#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn LedgerClient>,
    prover: Arc<dyn Prover>,
    artifacts: ArtifactStore,
    roles: Vec<String>,
    operation: String,
    proof_timeout: Duration,
    gate: Arc<Semaphore>,
}

impl Orchestrator {
    /// `roles` are attestor names whose payloads feed the prover, in order.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        prover: Arc<dyn Prover>,
        artifacts: ArtifactStore,
        roles: Vec<String>,
        operation: impl Into<String>,
        proof_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            prover,
            artifacts,
            roles,
            operation: operation.into(),
            proof_timeout,
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// True while a pipeline holds the gate.
    pub fn is_busy(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// Run the pipeline for `period` if the gate is free.
    ///
    /// Errors leave the period without a result; the gate is released on
    /// every exit path, including cancellation of the returned future.
    pub async fn process_period(&self, period: PeriodId) -> Result<PipelineOutcome> {
        let _permit = match self.gate.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                info!(
                    "{} Pipeline busy, dropping trigger for period {}",
                    prefix::PULSE,
                    period
                );
                return Ok(PipelineOutcome::Busy);
            }
        };

        match self.run_pipeline(period).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    "{} Pipeline for period {} failed: {} (will retry on next scan)",
                    prefix::PULSE,
                    period,
                    e
                );
                Err(e)
            }
        }
    }

    /// React to a ledger event. Only quorum signals start a pipeline.
    pub async fn handle_event(&self, event: &LedgerEvent) -> Result<Option<PipelineOutcome>> {
        match event {
            LedgerEvent::PeriodQuorumReached { period, count } => {
                info!(
                    "{} Quorum reached for period {} ({} attestors)",
                    prefix::PULSE,
                    period,
                    count
                );
                self.process_period(*period).await.map(Some)
            }
            other => {
                debug!(?other, "ignoring ledger event");
                Ok(None)
            }
        }
    }

    /// Walk periods `0..=current` and run the pipeline for every period at
    /// quorum without a result.
    pub async fn reconcile_backlog(&self) -> Result<ReconcileReport> {
        let current = self.ledger.current_period()?;
        let required = self.ledger.required_attestor_count()?;
        let mut report = ReconcileReport::default();

        for period in 0..=current {
            report.scanned += 1;
            if self.ledger.verification_result(period)?.is_some() {
                continue;
            }
            if self.ledger.period_attestor_count(period)? < required {
                continue;
            }

            debug!("{} Backlog period {} is pending", prefix::PULSE, period);
            match self.process_period(period).await {
                Ok(PipelineOutcome::Published { .. }) => report.published.push(period),
                Ok(PipelineOutcome::Busy) => {
                    report.interrupted = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => report.failed.push(period),
            }
        }

        if !report.published.is_empty() || !report.failed.is_empty() {
            info!(
                "{} Backlog scan: {} periods, {} published, {} failed",
                prefix::PULSE,
                report.scanned,
                report.published.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    /// Serve until `shutdown` resolves.
    ///
    /// A backlog scan runs immediately and then every `scan_interval`.
    /// Quorum events from `events`, when given, start pipelines as they
    /// arrive. In-flight work is aborted on shutdown, which kills any
    /// running prover and releases the gate.
    pub async fn run(
        &self,
        events: Option<broadcast::Receiver<LedgerEvent>>,
        scan_interval: Duration,
        shutdown: impl Future<Output = ()>,
    ) {
        info!(
            "{} Orchestrator started (roles: {}, operation: {}, scan every {:?})",
            prefix::PULSE_OPEN,
            self.roles.join(","),
            self.operation,
            scan_interval
        );

        let mut events = events.map(BroadcastStream::new);
        let mut ticker = tokio::time::interval(scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let this = self.clone();
                    tasks.spawn(async move {
                        if let Err(e) = this.reconcile_backlog().await {
                            warn!("{} Backlog scan failed: {}", prefix::PULSE, e);
                        }
                    });
                }
                item = next_event(&mut events) => match item {
                    Some(Ok(event)) => {
                        if matches!(event, LedgerEvent::PeriodQuorumReached { .. }) {
                            let this = self.clone();
                            tasks.spawn(async move {
                                if let Err(e) = this.handle_event(&event).await {
                                    debug!(
                                        "{} Event-triggered pipeline failed: {}",
                                        prefix::PULSE,
                                        e
                                    );
                                }
                            });
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                        warn!(
                            "{} Missed {} ledger events; the next scan will catch up",
                            prefix::PULSE,
                            missed
                        );
                    }
                    None => {
                        info!("{} Event stream closed, continuing with scans only", prefix::PULSE);
                        events = None;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("{} Pipeline task panicked: {}", prefix::PULSE, e);
                        }
                    }
                }
            }
        }

        info!(
            "{} Orchestrator stopping ({} tasks in flight)",
            prefix::PULSE_CLOSE,
            tasks.len()
        );
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        info!("{} Orchestrator stopped", prefix::PULSE_CLOSE);
    }

    async fn run_pipeline(&self, period: PeriodId) -> Result<PipelineOutcome> {
        if self.ledger.verification_result(period)?.is_some() {
            debug!("{} Period {} already has a result", prefix::PULSE, period);
            return Ok(PipelineOutcome::AlreadyPublished);
        }

        let required = self.ledger.required_attestor_count()?;
        let count = self.ledger.period_attestor_count(period)?;
        if count < required {
            debug!(
                "{} Period {} not eligible ({}/{} attestors)",
                prefix::PULSE,
                period,
                count,
                required
            );
            return Ok(PipelineOutcome::NotEligible);
        }

        let inputs = self.retrieve(period)?;
        let output = self.artifacts.prepare_proof(period)?;
        let request = ProofRequest {
            period,
            operation: self.operation.clone(),
            inputs,
            output,
        };

        info!(
            "{} Proving period {} ({} over {} inputs)",
            prefix::PULSE,
            period,
            request.operation,
            request.inputs.len()
        );
        let output = tokio::time::timeout(self.proof_timeout, self.prover.prove(&request))
            .await
            .map_err(|_| OrchestratorError::Timeout {
                period,
                timeout: self.proof_timeout,
            })??;

        let proof_len = output.proof.len();
        match self
            .ledger
            .publish_verification_result(period, output.passed, output.proof)
        {
            Ok(()) => {
                info!(
                    "{} Published period {}: {} ({} byte proof)",
                    prefix::PULSE,
                    period,
                    if output.passed { "passed" } else { "failed" },
                    proof_len
                );
                Ok(PipelineOutcome::Published {
                    passed: output.passed,
                })
            }
            Err(EngineError::ResultAlreadyPublished(_)) => {
                info!(
                    "{} Period {} was published by another actor",
                    prefix::PULSE,
                    period
                );
                Ok(PipelineOutcome::AlreadyPublished)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the payloads that feed the prover, one artifact per role.
    fn retrieve(&self, period: PeriodId) -> Result<Vec<PathBuf>> {
        check_labels(&self.roles).map_err(OrchestratorError::Config)?;
        let attestors = self.resolve_attestors(period)?;
        let mut inputs = Vec::with_capacity(attestors.len());

        for (role, address) in self.roles.iter().zip(&attestors) {
            let attestation = self.ledger.attestation(period, address)?.ok_or_else(|| {
                OrchestratorError::ArtifactMissing {
                    period,
                    detail: format!("no attestation from {} ({})", role, address),
                }
            })?;
            debug!(
                "{} Retrieved {} payload {} for period {}",
                prefix::LEDGER,
                role,
                attestation.payload_digest(),
                period
            );
            inputs.push(
                self.artifacts
                    .write_payload(period, role, &attestation.payload)?,
            );
        }
        Ok(inputs)
    }

    /// Attestors by role name, or the first submitters of the period when
    /// any role has no registered attestor with a submission.
    fn resolve_attestors(&self, period: PeriodId) -> Result<Vec<Address>> {
        let mut by_role = Vec::with_capacity(self.roles.len());
        for role in &self.roles {
            let Some(attestor) = self.ledger.attestor_by_name(role)? else {
                break;
            };
            if self.ledger.attestation(period, &attestor.address)?.is_none() {
                break;
            }
            by_role.push(attestor.address);
        }
        if by_role.len() == self.roles.len() {
            return Ok(by_role);
        }

        let submitters = self.ledger.period_attestors(period)?;
        if submitters.len() < self.roles.len() {
            return Err(OrchestratorError::ArtifactMissing {
                period,
                detail: format!(
                    "need {} payloads, period has {} submitters",
                    self.roles.len(),
                    submitters.len()
                ),
            });
        }
        debug!(
            "{} Role lookup incomplete for period {}, using first {} submitters",
            prefix::PULSE,
            period,
            self.roles.len()
        );
        Ok(submitters.into_iter().take(self.roles.len()).collect())
    }
}

async fn next_event(
    events: &mut Option<BroadcastStream<LedgerEvent>>,
) -> Option<std::result::Result<LedgerEvent, BroadcastStreamRecvError>> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("roles", &self.roles)
            .field("operation", &self.operation)
            .field("proof_timeout", &self.proof_timeout)
            .field("artifacts", &self.artifacts.root())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LocalLedger;
    use crate::prover::ProofOutput;
    use async_trait::async_trait;
    use zkattest_core::PeriodEngine;

    struct EchoProver;

    #[async_trait]
    impl Prover for EchoProver {
        async fn prove(&self, request: &ProofRequest) -> Result<ProofOutput> {
            let mut proof = Vec::new();
            for input in &request.inputs {
                proof.extend(std::fs::read(input)?);
            }
            Ok(ProofOutput {
                passed: true,
                proof,
            })
        }
    }

    fn setup(dir: &std::path::Path) -> (LocalLedger, Orchestrator) {
        let admin = Address::new("admin");
        let ledger = LocalLedger::new(PeriodEngine::genesis(admin.clone(), 2).unwrap(), admin.clone());
        ledger
            .register_attestor(&admin, Address::new("0xa"), "exchange")
            .unwrap();
        ledger
            .register_attestor(&admin, Address::new("0xb"), "regulator")
            .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(ledger.clone()),
            Arc::new(EchoProver),
            ArtifactStore::new(dir, 4),
            vec!["exchange".to_string(), "regulator".to_string()],
            "gte",
            Duration::from_secs(5),
        );
        (ledger, orchestrator)
    }

    #[tokio::test]
    async fn test_payloads_feed_prover_in_role_order() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, orchestrator) = setup(dir.path());
        // Regulator submits first; role order still decides argument order.
        ledger.submit_attestation(&Address::new("0xb"), b"R".to_vec()).unwrap();
        ledger.submit_attestation(&Address::new("0xa"), b"E".to_vec()).unwrap();

        let outcome = orchestrator.process_period(0).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Published { passed: true });
        let result = ledger.verification_result(0).unwrap().unwrap();
        assert_eq!(result.proof_data, b"ER".to_vec());
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_not_eligible_below_quorum() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, orchestrator) = setup(dir.path());
        ledger.submit_attestation(&Address::new("0xa"), b"E".to_vec()).unwrap();

        assert_eq!(
            orchestrator.process_period(0).await.unwrap(),
            PipelineOutcome::NotEligible
        );
        assert!(ledger.verification_result(0).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_quorum_events_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let (_ledger, orchestrator) = setup(dir.path());
        let event = LedgerEvent::AttestationRecorded {
            period: 0,
            attestor: Address::new("0xa"),
            timestamp: 1,
        };
        assert_eq!(orchestrator.handle_event(&event).await.unwrap(), None);
    }
}
