//! Error types for the ledger and action execution

use crate::transaction::TransactionId;
use keel_store::StoreError;

/// Ledger lookup and rollback failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No transaction with this identifier
    #[error("transaction {0} not found")]
    NotFound(TransactionId),

    /// Transaction already rolled back; rollback is one-way
    #[error("transaction {0} already rolled back")]
    AlreadyRolledBack(TransactionId),
}

impl LedgerError {
    /// Transaction the error refers to
    #[inline]
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            Self::NotFound(id) | Self::AlreadyRolledBack(id) => *id,
        }
    }
}

/// Rollback-and-restore failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    /// Rollback rejected by the ledger
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Re-applying the previous state failed; the transaction stays completed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// The wrapped action failed; no transaction was recorded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action failed: {0}")]
pub struct ActionFailure(pub String);
