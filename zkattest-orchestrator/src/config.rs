//! Orchestrator configuration
//!
//! Loaded from an optional JSON file; every field has a default so a
//! partial file (or none at all) is valid. CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zkattest::Error;

use crate::artifacts::check_labels;

/// Orchestrator and CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Ledger snapshot file
    pub ledger_path: PathBuf,
    /// Root directory for payload and proof artifacts
    pub work_dir: PathBuf,
    /// Identity used to publish verification results
    pub operator: String,
    /// Attestor names whose payloads feed the prover, in argument order
    pub roles: Vec<String>,
    /// Operation passed to the prover (e.g. "gte" for reserves >= liabilities)
    pub operation: String,
    /// Prover command template; supports {operation}, {inputs}, {output}
    pub prover_command: Vec<String>,
    /// Encryptor command template; supports {value}, {key}, {output}
    pub encryptor_command: Vec<String>,
    pub proof_timeout_secs: u64,
    pub scan_interval_secs: u64,
    /// Number of period artifact directories kept on disk
    pub artifact_retention: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("zkattest-ledger.json"),
            work_dir: PathBuf::from("zkattest-work"),
            operator: "admin".to_string(),
            roles: vec!["exchange".to_string(), "regulator".to_string()],
            operation: "gte".to_string(),
            prover_command: Vec::new(),
            encryptor_command: Vec::new(),
            proof_timeout_secs: 300,
            scan_interval_secs: 30,
            artifact_retention: 16,
        }
    }
}

impl OrchestratorConfig {
    /// Load from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> zkattest::Result<Self> {
        let config = match path {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    Error::config(format!("failed to read {}: {}", path.display(), e))
                })?;
                serde_json::from_slice(&bytes)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the orchestrator cannot run with.
    pub fn validate(&self) -> zkattest::Result<()> {
        if self.roles.is_empty() {
            return Err(Error::config("roles must not be empty"));
        }
        if self.roles.iter().any(|r| r.trim().is_empty()) {
            return Err(Error::config("roles must not contain blank names"));
        }
        check_labels(&self.roles).map_err(Error::config)?;
        if self.operator.trim().is_empty() {
            return Err(Error::config("operator must not be blank"));
        }
        if self.proof_timeout_secs == 0 {
            return Err(Error::config("proof_timeout_secs must be positive"));
        }
        if self.scan_interval_secs == 0 {
            return Err(Error::config("scan_interval_secs must be positive"));
        }
        if self.artifact_retention == 0 {
            return Err(Error::config("artifact_retention must be positive"));
        }
        Ok(())
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.proof_timeout_secs)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}
