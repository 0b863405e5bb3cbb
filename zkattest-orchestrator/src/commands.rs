//! CLI command handlers over the file-backed ledger.
//!
//! Each handler opens the ledger snapshot, performs one operation as the
//! configured caller, and returns a value for the binary to print.

use serde_json::{json, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use zkattest::tracing::prefix;
use zkattest::{Error, Result};
use zkattest_core::{Address, PeriodId, SubmissionReceipt};

use crate::artifacts::ArtifactStore;
use crate::config::OrchestratorConfig;
use crate::encryptor::{Encryptor, SubprocessEncryptor};
use crate::file_ledger::FileLedger;
use crate::ledger::LedgerClient;
use crate::orchestrator::Orchestrator;
use crate::prover::SubprocessProver;

/// Configuration plus the identity commands act as.
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: OrchestratorConfig,
    caller: Address,
}

impl CommandContext {
    /// `caller` defaults to the configured operator.
    pub fn new(config: OrchestratorConfig, caller: Option<String>) -> Self {
        let caller = Address::new(caller.unwrap_or_else(|| config.operator.clone()));
        Self { config, caller }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    fn ledger(&self) -> Result<FileLedger> {
        Ok(FileLedger::open(
            &self.config.ledger_path,
            Address::new(self.config.operator.as_str()),
        )?)
    }

    fn artifacts(&self) -> ArtifactStore {
        ArtifactStore::new(&self.config.work_dir, self.config.artifact_retention)
    }

    pub fn init(&self, admin: Option<&str>, quorum: usize, force: bool) -> Result<()> {
        let admin = admin.map(Address::new).unwrap_or_else(|| self.caller.clone());
        FileLedger::init(&self.config.ledger_path, admin, quorum, force)?;
        Ok(())
    }

    pub fn register(&self, address: &str, name: &str) -> Result<()> {
        let caller = self.caller.clone();
        self.ledger()?
            .apply(|engine| engine.register_attestor(&caller, Address::new(address), name))?;
        info!("{} Registered {} as {}", prefix::LEDGER, address, name);
        Ok(())
    }

    /// Submit as the caller, or as the administrator on behalf of `on_behalf`.
    pub fn submit(&self, payload: Vec<u8>, on_behalf: Option<&str>) -> Result<SubmissionReceipt> {
        let caller = self.caller.clone();
        let (receipt, _) = self.ledger()?.apply(|engine| match on_behalf {
            Some(attestor) => {
                engine.submit_attestation_on_behalf(&caller, &Address::new(attestor), payload)
            }
            None => engine.submit_attestation(&caller, payload),
        })?;
        info!(
            "{} Attestation recorded for period {} ({} attestors{})",
            prefix::LEDGER,
            receipt.period,
            receipt.attestor_count,
            if receipt.quorum_reached {
                ", quorum reached"
            } else {
                ""
            }
        );
        Ok(receipt)
    }

    /// Encrypt `value` with the configured encryptor and submit the ciphertext.
    pub async fn commit(
        &self,
        value: u64,
        key: &Path,
        output: Option<PathBuf>,
        on_behalf: Option<&str>,
    ) -> Result<SubmissionReceipt> {
        let encryptor = SubprocessEncryptor::from_argv(&self.config.encryptor_command)?;
        let label = on_behalf.unwrap_or(self.caller.as_str());
        let output = output.unwrap_or_else(|| self.artifacts().commitment_path(label));
        let payload = encryptor.encrypt(value, key, &output).await?;
        info!(
            "{} Encrypted commitment written to {} ({} bytes)",
            prefix::LEDGER,
            output.display(),
            payload.len()
        );
        self.submit(payload, on_behalf)
    }

    pub fn add_rule(&self, description: &str, rule_data: Vec<u8>) -> Result<usize> {
        let caller = self.caller.clone();
        let (index, _) = self
            .ledger()?
            .apply(|engine| engine.add_verification_rule(&caller, description, rule_data))?;
        Ok(index)
    }

    pub fn publish(&self, period: PeriodId, passed: bool, proof: Vec<u8>) -> Result<()> {
        let caller = self.caller.clone();
        self.ledger()?.apply(|engine| {
            engine.publish_verification_result(&caller, period, passed, proof)
        })?;
        Ok(())
    }

    pub fn force_advance(&self) -> Result<PeriodId> {
        let caller = self.caller.clone();
        let (period, _) = self
            .ledger()?
            .apply(|engine| engine.force_advance_period(&caller))?;
        info!("{} Forced advance to period {}", prefix::LEDGER, period);
        Ok(period)
    }

    /// JSON summary of the ledger, or of one period.
    pub fn status(&self, period: Option<PeriodId>) -> Result<Value> {
        let engine = self.ledger()?.load()?;
        let current = engine.current_period()?;

        let describe = |period: PeriodId| -> Result<Value> {
            let attestors = engine.period_attestors(period)?;
            let result = engine.verification_result(period)?;
            Ok(json!({
                "period": period,
                "status": engine.period_status(period)?,
                "attestors": attestors,
                "result": result.map(|r| json!({
                    "passed": r.passed,
                    "proof_bytes": r.proof_data.len(),
                    "published_at": r.published_at,
                })),
            }))
        };

        if let Some(period) = period {
            return describe(period);
        }

        let periods = (0..=current).map(describe).collect::<Result<Vec<_>>>()?;
        let attestors: Vec<Value> = engine
            .attestors()?
            .into_iter()
            .map(|a| json!({ "address": a.address, "name": a.name }))
            .collect();
        Ok(json!({
            "admin": engine.admin(),
            "required_attestor_count": engine.required_attestor_count(),
            "current_period": current,
            "attestors": attestors,
            "rule_count": engine.rule_count()?,
            "periods": periods,
        }))
    }

    /// Run the orchestrator against the ledger file until `shutdown`.
    ///
    /// A file ledger has no push channel, so periods are picked up by the
    /// periodic backlog scan.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let prover = SubprocessProver::from_argv(&self.config.prover_command).map_err(|_| {
            Error::config("prover_command must be set to run the orchestrator")
        })?;
        let ledger: Arc<dyn LedgerClient> = Arc::new(self.ledger()?);
        let orchestrator = Orchestrator::new(
            ledger,
            Arc::new(prover),
            self.artifacts(),
            self.config.roles.clone(),
            self.config.operation.clone(),
            self.config.proof_timeout(),
        );
        orchestrator
            .run(None, self.config.scan_interval(), shutdown)
            .await;
        Ok(())
    }
}
