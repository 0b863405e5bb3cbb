//! Signals emitted by successful ledger mutations.

use serde::{Deserialize, Serialize};

use crate::model::{Address, PeriodId, Timestamp};

/// Ledger event. Consumers must tolerate duplicate and out-of-order delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    AttestorRegistered {
        attestor: Address,
        name: String,
    },
    AttestationRecorded {
        period: PeriodId,
        attestor: Address,
        timestamp: Timestamp,
    },
    /// Fired once per period, by the submission that reaches quorum
    PeriodQuorumReached {
        period: PeriodId,
        count: usize,
    },
    VerificationRuleAdded {
        index: usize,
        description: String,
    },
    VerificationPublished {
        period: PeriodId,
        passed: bool,
        timestamp: Timestamp,
    },
    PeriodAdvanced {
        from: PeriodId,
        to: PeriodId,
        forced: bool,
    },
}

impl LedgerEvent {
    /// Period the event refers to, if any.
    pub fn period(&self) -> Option<PeriodId> {
        match self {
            LedgerEvent::AttestationRecorded { period, .. }
            | LedgerEvent::PeriodQuorumReached { period, .. }
            | LedgerEvent::VerificationPublished { period, .. } => Some(*period),
            LedgerEvent::PeriodAdvanced { from, .. } => Some(*from),
            LedgerEvent::AttestorRegistered { .. } | LedgerEvent::VerificationRuleAdded { .. } => {
                None
            }
        }
    }
}
