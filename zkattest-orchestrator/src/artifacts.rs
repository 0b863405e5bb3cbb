//! On-disk artifacts handed to the prover.
//!
//! ```text
//! <work_dir>/
//! ├── period-0/
//! │   ├── exchange.bin    # payload, byte-exact copy of the ledger attestation
//! │   ├── regulator.bin
//! │   └── out/
//! │       └── proof.bin   # written by the prover
//! └── period-1/
//! ```
//!
//! Payload names come from sanitized role labels, which never contain a path
//! separator, so a payload can never land on the proof. Only the newest
//! `retention` period directories are kept.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zkattest_core::PeriodId;

use crate::error::{OrchestratorError, Result};

const PERIOD_DIR_PREFIX: &str = "period-";
const PROOF_DIR: &str = "out";
const PROOF_FILE: &str = "proof.bin";
const COMMITMENT_DIR: &str = "commitments";

/// Per-period artifact directories under a work dir.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    retention: usize,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            root: root.into(),
            retention: retention.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn period_dir(&self, period: PeriodId) -> PathBuf {
        self.root.join(format!("{}{}", PERIOD_DIR_PREFIX, period))
    }

    pub fn payload_path(&self, period: PeriodId, label: &str) -> PathBuf {
        self.period_dir(period).join(format!("{}.bin", sanitize(label)))
    }

    pub fn proof_path(&self, period: PeriodId) -> PathBuf {
        self.period_dir(period).join(PROOF_DIR).join(PROOF_FILE)
    }

    /// Default location for a locally encrypted commitment.
    pub fn commitment_path(&self, label: &str) -> PathBuf {
        self.root
            .join(COMMITMENT_DIR)
            .join(format!("{}.bin", sanitize(label)))
    }

    /// Persist a payload and verify it reads back byte-exact.
    ///
    /// An existing artifact with identical content is reused as is.
    pub fn write_payload(&self, period: PeriodId, label: &str, payload: &[u8]) -> Result<PathBuf> {
        let dir = self.period_dir(period);
        let created = !dir.exists();
        std::fs::create_dir_all(&dir)?;
        if created {
            self.prune(period);
        }

        let path = self.payload_path(period, label);
        let expected = digest(payload);

        match std::fs::read(&path) {
            Ok(existing) if digest(&existing) == expected => {
                debug!("Reusing cached artifact {}", path.display());
                return Ok(path);
            }
            _ => std::fs::write(&path, payload)?,
        }

        let written = std::fs::read(&path).map_err(|e| OrchestratorError::ArtifactMissing {
            period,
            detail: format!("{} unreadable after write: {}", path.display(), e),
        })?;
        if digest(&written) != expected {
            return Err(OrchestratorError::ArtifactMissing {
                period,
                detail: format!("{} does not match the ledger payload", path.display()),
            });
        }
        Ok(path)
    }

    /// Create the proof directory and remove any stale proof so the next
    /// prover run cannot be confused with it. Returns the proof path.
    pub fn prepare_proof(&self, period: PeriodId) -> Result<PathBuf> {
        let path = self.proof_path(period);
        std::fs::create_dir_all(self.period_dir(period).join(PROOF_DIR))?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(e) => Err(e.into()),
        }
    }

    /// Period ids with a directory on disk, ascending.
    pub fn cached_periods(&self) -> Vec<PeriodId> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut periods: Vec<PeriodId> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| name.strip_prefix(PERIOD_DIR_PREFIX))
                    .and_then(|id| id.parse().ok())
            })
            .collect();
        periods.sort_unstable();
        periods
    }

    /// Drop the oldest period directories beyond the retention bound,
    /// never touching `keep`.
    fn prune(&self, keep: PeriodId) {
        let periods = self.cached_periods();
        if periods.len() <= self.retention {
            return;
        }
        let excess = periods.len() - self.retention;
        for period in periods.into_iter().filter(|p| *p != keep).take(excess) {
            let dir = self.period_dir(period);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => debug!("Pruned artifacts {}", dir.display()),
                Err(e) => warn!("Failed to prune {}: {}", dir.display(), e),
            }
        }
    }
}

/// Check that every label maps to its own payload file.
///
/// Returns a description of the first collision: a repeated label, or two
/// labels equal after sanitizing (`a.b` and `a_b`).
pub fn check_labels(labels: &[String]) -> std::result::Result<(), String> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for label in labels {
        let file = sanitize(label);
        if let Some(previous) = seen.insert(file.clone(), label.as_str()) {
            return Err(if previous == label.as_str() {
                format!("role {:?} is listed twice", label)
            } else {
                format!(
                    "roles {:?} and {:?} both map to {}.bin",
                    previous, label, file
                )
            });
        }
    }
    Ok(())
}

fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Keep labels usable as file names.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_payload_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 4);

        let path = store.write_payload(3, "exchange", &[0, 1, 2, 255]).unwrap();
        assert_eq!(path, dir.path().join("period-3").join("exchange.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 1, 2, 255]);
    }

    #[test]
    fn test_write_payload_replaces_stale_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 4);

        store.write_payload(0, "exchange", b"old").unwrap();
        let path = store.write_payload(0, "exchange", b"new").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"new".to_vec());
    }

    #[test]
    fn test_labels_are_sanitized() {
        let store = ArtifactStore::new("/tmp/work", 4);
        assert_eq!(
            store.payload_path(1, "../evil name"),
            PathBuf::from("/tmp/work/period-1/___evil_name.bin")
        );
    }

    #[test]
    fn test_retention_prunes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 2);

        for period in 0..4 {
            store.write_payload(period, "exchange", &[period as u8 + 1]).unwrap();
        }

        assert_eq!(store.cached_periods(), vec![2, 3]);
    }

    #[test]
    fn test_retention_keeps_period_being_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 1);

        store.write_payload(5, "exchange", &[1]).unwrap();
        // A late retry for an older period must not delete itself.
        store.write_payload(2, "exchange", &[1]).unwrap();

        assert_eq!(store.cached_periods(), vec![2]);
        assert!(store.payload_path(2, "exchange").exists());
    }

    #[test]
    fn test_prepare_proof_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 2);
        store.write_payload(0, "exchange", &[1]).unwrap();
        let path = store.prepare_proof(0).unwrap();
        std::fs::write(&path, b"proof").unwrap();

        assert_eq!(store.prepare_proof(0).unwrap(), path);
        store.prepare_proof(0).unwrap();
        assert!(!path.exists());
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_payload_named_proof_survives_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), 2);

        let payload = store.write_payload(0, "proof", b"liabilities").unwrap();
        let proof = store.prepare_proof(0).unwrap();

        assert_ne!(payload, proof);
        assert_eq!(std::fs::read(&payload).unwrap(), b"liabilities".to_vec());
    }

    #[test]
    fn test_check_labels_rejects_duplicates() {
        let labels = vec!["exchange".to_string(), "exchange".to_string()];
        let err = check_labels(&labels).unwrap_err();
        assert!(err.contains("listed twice"));
    }

    #[test]
    fn test_check_labels_rejects_sanitized_collisions() {
        let labels = vec!["a.b".to_string(), "a_b".to_string()];
        let err = check_labels(&labels).unwrap_err();
        assert!(err.contains("a_b.bin"));
        assert!(check_labels(&["exchange".to_string(), "proof".to_string()]).is_ok());
    }
}
