//! Append-only transaction ledger
//!
//! Transactions are retained for the lifetime of the ledger. The ledger
//! answers "what was the state before this action" but never restores
//! anything itself.

use crate::error::LedgerError;
use crate::transaction::{
    ActionKind, ActionTarget, ClientId, RollbackReceipt, Transaction, TransactionId,
};
use indexmap::IndexMap;
use keel_store::Record;
use parking_lot::Mutex;
use std::cmp::Reverse;

#[derive(Debug, Default)]
struct LedgerState {
    transactions: IndexMap<TransactionId, Transaction>,
    next_sequence: u64,
}

/// Filters for [`TransactionLedger::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only transactions owned by this client
    pub client_id: Option<ClientId>,
    /// Only transactions of this action kind
    pub action: Option<ActionKind>,
}

impl TransactionFilter {
    /// Match everything
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a client
    #[inline]
    #[must_use]
    pub fn client(mut self, client_id: impl Into<ClientId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Restrict to an action kind
    #[inline]
    #[must_use]
    pub fn action(mut self, action: ActionKind) -> Self {
        self.action = Some(action);
        self
    }

    fn matches(&self, tx: &Transaction) -> bool {
        self.client_id
            .as_ref()
            .map_or(true, |c| tx.client_id() == Some(c))
            && self.action.map_or(true, |a| tx.action() == a)
    }
}

/// Ledger of before/after snapshots, one per destructive action
#[derive(Debug, Default)]
pub struct TransactionLedger {
    inner: Mutex<LedgerState>,
}

impl TransactionLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed action
    ///
    /// Always succeeds and assigns a fresh identifier.
    pub fn record(
        &self,
        target: ActionTarget,
        previous_state: Option<Record>,
        new_state: Option<Record>,
    ) -> TransactionId {
        let mut guard = self.inner.lock();
        let sequence = guard.next_sequence;
        guard.next_sequence += 1;

        let tx = Transaction::new(target, previous_state, new_state, sequence);
        let id = tx.id();
        tracing::info!(
            transaction_id = %id,
            action = %tx.action(),
            kind = %tx.resource_kind(),
            resource_id = %tx.resource_id(),
            "Transaction recorded"
        );
        guard.transactions.insert(id, tx);
        id
    }

    /// Mark a transaction rolled back and report what to restore
    ///
    /// # Errors
    /// - [`LedgerError::NotFound`] for an unknown identifier
    /// - [`LedgerError::AlreadyRolledBack`] if it was already undone
    pub fn rollback(&self, id: &TransactionId) -> Result<RollbackReceipt, LedgerError> {
        self.rollback_with(id, |_| Ok::<(), LedgerError>(()))
    }

    /// Roll back after `apply` succeeds, holding the ledger lock throughout
    ///
    /// The status only changes when `apply` returns `Ok`; a failure leaves
    /// the transaction completed and is returned to the caller.
    ///
    /// # Errors
    /// Ledger errors as for [`rollback`](Self::rollback), or whatever
    /// `apply` returns
    pub fn rollback_with<E, F>(&self, id: &TransactionId, apply: F) -> Result<RollbackReceipt, E>
    where
        E: From<LedgerError>,
        F: FnOnce(&Transaction) -> Result<(), E>,
    {
        let mut guard = self.inner.lock();
        let tx = guard
            .transactions
            .get_mut(id)
            .ok_or(LedgerError::NotFound(*id))?;

        if tx.is_rolled_back() {
            tracing::warn!(transaction_id = %id, "Rollback rejected: already rolled back");
            return Err(LedgerError::AlreadyRolledBack(*id).into());
        }

        apply(tx)?;
        tx.mark_rolled_back();
        tracing::info!(
            transaction_id = %id,
            action = %tx.action(),
            kind = %tx.resource_kind(),
            resource_id = %tx.resource_id(),
            "Transaction rolled back"
        );
        Ok(tx.receipt())
    }

    /// Look up a transaction
    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<Transaction> {
        self.inner.lock().transactions.get(id).cloned()
    }

    /// Transactions matching `filter`, newest first
    #[must_use]
    pub fn list(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let guard = self.inner.lock();
        let mut out: Vec<Transaction> = guard
            .transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        out.sort_by_key(|tx| Reverse((tx.timestamp(), tx.sequence())));
        out
    }

    /// Number of recorded transactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().transactions.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
