//! Proving collaborator.
//!
//! The prover turns the period's payload artifacts and an operation name into
//! a verdict plus opaque proof bytes. `SubprocessProver` runs an external
//! command; tests substitute their own `Prover`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;
use zkattest_core::PeriodId;

use crate::error::{OrchestratorError, Result};
use crate::process::{exit_label, stderr_tail, CommandTemplate, Placeholder};

/// Inputs for one proving run.
#[derive(Debug, Clone)]
pub struct ProofRequest {
    pub period: PeriodId,
    pub operation: String,
    /// Payload artifacts in role order
    pub inputs: Vec<PathBuf>,
    /// Where the prover must write the proof
    pub output: PathBuf,
}

/// Verdict and proof bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOutput {
    pub passed: bool,
    pub proof: Vec<u8>,
}

/// Given artifact paths and parameters, return proof bytes or a typed failure.
#[async_trait]
pub trait Prover: Send + Sync {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofOutput>;
}

/// Runs an external prover command.
///
/// Contract: exit code 0, a non-empty proof file at `{output}`, and a verdict
/// as the last non-empty stdout line (`passed`/`true` or `failed`/`false`).
#[derive(Debug, Clone)]
pub struct SubprocessProver {
    template: CommandTemplate,
}

impl SubprocessProver {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }

    pub fn from_argv(argv: &[String]) -> Result<Self> {
        Ok(Self::new(CommandTemplate::parse(argv)?))
    }
}

#[async_trait]
impl Prover for SubprocessProver {
    async fn prove(&self, request: &ProofRequest) -> Result<ProofOutput> {
        let period = request.period;
        let mut vars = HashMap::new();
        vars.insert("operation", Placeholder::One(request.operation.clone()));
        vars.insert(
            "inputs",
            Placeholder::Many(
                request
                    .inputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            ),
        );
        vars.insert(
            "output",
            Placeholder::One(request.output.display().to_string()),
        );

        debug!(
            "Running prover {} for period {} ({} inputs)",
            self.template.program(),
            period,
            request.inputs.len()
        );

        let output = self
            .template
            .command(&vars)
            .output()
            .await
            .map_err(|e| OrchestratorError::ProvingFailed {
                period,
                detail: format!("failed to spawn {}: {}", self.template.program(), e),
            })?;

        if !output.status.success() {
            return Err(OrchestratorError::ProvingFailed {
                period,
                detail: format!("{}: {}", exit_label(&output), stderr_tail(&output)),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let passed = parse_verdict(&stdout).ok_or_else(|| OrchestratorError::ProvingFailed {
            period,
            detail: "prover printed no verdict".to_string(),
        })?;

        let proof = std::fs::read(&request.output).map_err(|e| {
            OrchestratorError::ArtifactMissing {
                period,
                detail: format!("proof {} unreadable: {}", request.output.display(), e),
            }
        })?;
        if proof.is_empty() {
            return Err(OrchestratorError::ArtifactMissing {
                period,
                detail: format!("proof {} is empty", request.output.display()),
            });
        }

        Ok(ProofOutput { passed, proof })
    }
}

/// Read the verdict from the last non-empty line of prover output.
pub fn parse_verdict(stdout: &str) -> Option<bool> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    match line.trim().to_ascii_lowercase().as_str() {
        "passed" | "pass" | "true" => Some(true),
        "failed" | "fail" | "false" => Some(false),
        _ => None,
    }
}
