//! zkattest proof orchestrator
//!
//! Bridges the period engine's quorum signal to a published verification
//! result. Each eligible period goes through retrieve, prove and publish
//! exactly once; at most one proof runs at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ events ┌──────────────┐  artifacts  ┌────────────┐
//! │ LedgerClient │───────▶│ Orchestrator │────────────▶│   Prover   │
//! │ Local / File │◀───────│  (1 permit)  │◀────────────│ subprocess │
//! └──────────────┘ publish└──────────────┘ proof bytes └────────────┘
//! ```
//!
//! - `ledger` / `file_ledger`: in-process and JSON-file ledger clients
//! - `artifacts`: per-period payload and proof files
//! - `prover` / `encryptor`: external collaborators behind async traits
//! - `orchestrator`: the gated pipeline, backlog scan and run loop
//! - `commands`: CLI handlers used by the `zkattest` binary

pub mod artifacts;
pub mod commands;
pub mod config;
pub mod encryptor;
pub mod error;
pub mod file_ledger;
pub mod ledger;
pub mod orchestrator;
pub mod process;
pub mod prover;

pub use artifacts::ArtifactStore;
pub use commands::CommandContext;
pub use config::OrchestratorConfig;
pub use encryptor::{Encryptor, SubprocessEncryptor};
pub use error::{OrchestratorError, Result};
pub use file_ledger::FileLedger;
pub use ledger::{LedgerClient, LocalLedger};
pub use orchestrator::{Orchestrator, PipelineOutcome, ReconcileReport};
pub use process::CommandTemplate;
pub use prover::{ProofOutput, ProofRequest, Prover, SubprocessProver};
