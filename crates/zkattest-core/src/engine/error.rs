//! Period engine error types

use thiserror::Error;

use crate::model::{Address, PeriodId};
use crate::storage::StoreError;

/// Rejections raised synchronously by ledger operations.
///
/// The engine never retries; callers decide what to do with each variant.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Caller lacks the role the operation requires
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("attestor already registered: {0}")]
    AlreadyRegistered(Address),

    /// The attestor already has an attestation in this period
    #[error("duplicate submission by {attestor} for period {period}")]
    DuplicateSubmission { period: PeriodId, attestor: Address },

    #[error("period {period} not complete: {count} of {required} attestors")]
    PeriodNotComplete {
        period: PeriodId,
        count: usize,
        required: usize,
    },

    #[error("verification result already published for period {0}")]
    ResultAlreadyPublished(PeriodId),

    /// Empty, blank or oversized input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ledger store: {0}")]
    Store(#[from] StoreError),
}
