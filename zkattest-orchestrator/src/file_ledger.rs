//! File-backed ledger.
//!
//! The full ledger state lives in one JSON snapshot. Every read loads the
//! file fresh, so a long-running orchestrator sees submissions made by other
//! CLI invocations on its next scan. Mutations load, apply, and replace the
//! file through a uniquely named temp file and a rename, so readers never see
//! a torn write.
//!
//! Every mutation holds an exclusive lock on a `<ledger>.lock` sidecar for
//! the whole load, apply, write sequence. The lock is advisory and shared by
//! all handles and processes using the same ledger path.

use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use zkattest::tracing::prefix;
use zkattest_core::{
    Address, Attestation, Attestor, Clock, EngineError, LedgerEvent, LedgerStore, MemoryLedger,
    PeriodEngine, PeriodId, StoreError, SystemClock, VerificationResult,
};

use crate::ledger::LedgerClient;

/// Ledger persisted as a JSON snapshot on disk.
pub struct FileLedger {
    path: PathBuf,
    operator: Address,
    clock: Arc<dyn Clock>,
}

impl FileLedger {
    /// Open an existing snapshot.
    pub fn open(path: impl Into<PathBuf>, operator: Address) -> Result<Self, EngineError> {
        let path = path.into();
        if !path.is_file() {
            return Err(StoreError::NotFound(format!(
                "ledger file {} (run `zkattest init` first)",
                path.display()
            ))
            .into());
        }
        Ok(Self::with_clock(path, operator, Arc::new(SystemClock)))
    }

    /// Create a fresh ledger file at period 0.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn init(
        path: impl Into<PathBuf>,
        admin: Address,
        required_attestor_count: usize,
        force: bool,
    ) -> Result<Self, EngineError> {
        let path = path.into();
        let _lock = lock_ledger(&path)?;
        if path.exists() && !force {
            return Err(StoreError::AlreadyExists(format!(
                "ledger file {}",
                path.display()
            ))
            .into());
        }
        let engine = PeriodEngine::genesis(admin.clone(), required_attestor_count)?;
        write_snapshot(&path, engine.store())?;
        info!(
            "{} Initialized ledger at {} (admin {}, quorum {})",
            prefix::LEDGER,
            path.display(),
            admin,
            required_attestor_count
        );
        Ok(Self::with_clock(path, admin, Arc::new(SystemClock)))
    }

    pub fn with_clock(path: PathBuf, operator: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            path,
            operator,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot into a throwaway engine.
    pub fn load(&self) -> Result<PeriodEngine<MemoryLedger>, EngineError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            StoreError::Backend(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let store = MemoryLedger::from_json(&bytes)?;
        Ok(PeriodEngine::new(store, self.clock.clone()))
    }

    /// Apply a mutation and persist the result.
    ///
    /// The snapshot is only rewritten when the mutation succeeds. The ledger
    /// lock is held from load to rename, so concurrent writers never lose
    /// each other's changes.
    pub fn apply<T>(
        &self,
        op: impl FnOnce(&mut PeriodEngine<MemoryLedger>) -> Result<T, EngineError>,
    ) -> Result<(T, Vec<LedgerEvent>), EngineError> {
        let _lock = lock_ledger(&self.path)?;
        let mut engine = self.load()?;
        let value = op(&mut engine)?;
        let events = engine.take_events();
        write_snapshot(&self.path, engine.store())?;
        for event in &events {
            debug!(?event, "{} ledger event", prefix::LEDGER);
        }
        Ok((value, events))
    }

    fn read<T>(
        &self,
        op: impl FnOnce(&PeriodEngine<MemoryLedger>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let engine = self.load()?;
        op(&engine)
    }
}

/// `<ledger>.lock` next to the ledger file.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("ledger"));
    name.push(".lock");
    path.with_file_name(name)
}

/// Block until this process holds the ledger's exclusive lock.
///
/// The lock is released when the returned file is dropped.
fn lock_ledger(path: &Path) -> Result<File, StoreError> {
    let lock = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock)
        .map_err(|e| StoreError::Backend(format!("failed to open {}: {}", lock.display(), e)))?;
    file.lock_exclusive()
        .map_err(|e| StoreError::Backend(format!("failed to lock {}: {}", lock.display(), e)))?;
    Ok(file)
}

fn write_snapshot(path: &Path, store: &MemoryLedger) -> Result<(), StoreError> {
    let bytes = store.to_json()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        StoreError::Backend(format!("failed to create temp file in {}: {}", dir.display(), e))
    })?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| {
            StoreError::Backend(format!("failed to write {}: {}", tmp.path().display(), e))
        })?;
    tmp.persist(path).map_err(|e| {
        StoreError::Backend(format!("failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

impl LedgerClient for FileLedger {
    fn current_period(&self) -> Result<PeriodId, EngineError> {
        self.read(|engine| engine.current_period())
    }

    fn required_attestor_count(&self) -> Result<usize, EngineError> {
        self.read(|engine| Ok(engine.store().required_attestor_count()))
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
        .map(|_| ())
    }
}
