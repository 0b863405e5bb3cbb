//! Encryption collaborator.
//!
//! Produces attestation payloads: a numeric value is encrypted under a public
//! key by an external command and written to a named artifact, whose bytes
//! become the payload submitted to the ledger.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{OrchestratorError, Result};
use crate::process::{exit_label, stderr_tail, CommandTemplate, Placeholder};

/// Encrypts a value into an opaque payload artifact.
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Encrypt `value` under the key material at `key`, write the ciphertext
    /// to `output`, and return its bytes.
    async fn encrypt(&self, value: u64, key: &Path, output: &Path) -> Result<Vec<u8>>;
}

/// Runs an external encryption command with `{value}`, `{key}`, `{output}`.
#[derive(Debug, Clone)]
pub struct SubprocessEncryptor {
    template: CommandTemplate,
}

impl SubprocessEncryptor {
    pub fn new(template: CommandTemplate) -> Self {
        Self { template }
    }

    pub fn from_argv(argv: &[String]) -> Result<Self> {
        Ok(Self::new(CommandTemplate::parse(argv)?))
    }
}

#[async_trait]
impl Encryptor for SubprocessEncryptor {
    async fn encrypt(&self, value: u64, key: &Path, output: &Path) -> Result<Vec<u8>> {
        if !key.is_file() {
            return Err(OrchestratorError::EncryptionFailed(format!(
                "key material {} not found",
                key.display()
            )));
        }
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut vars = HashMap::new();
        vars.insert("value", Placeholder::One(value.to_string()));
        vars.insert("key", Placeholder::One(key.display().to_string()));
        vars.insert("output", Placeholder::One(output.display().to_string()));

        debug!("Running encryptor {}", self.template.program());
        let result = self
            .template
            .command(&vars)
            .output()
            .await
            .map_err(|e| {
                OrchestratorError::EncryptionFailed(format!(
                    "failed to spawn {}: {}",
                    self.template.program(),
                    e
                ))
            })?;

        if !result.status.success() {
            return Err(OrchestratorError::EncryptionFailed(format!(
                "{}: {}",
                exit_label(&result),
                stderr_tail(&result)
            )));
        }

        let payload = std::fs::read(output).map_err(|e| {
            OrchestratorError::EncryptionFailed(format!(
                "ciphertext {} unreadable: {}",
                output.display(),
                e
            ))
        })?;
        if payload.is_empty() {
            return Err(OrchestratorError::EncryptionFailed(format!(
                "ciphertext {} is empty",
                output.display()
            )));
        }
        Ok(payload)
    }
}
