//! Rollback-tracked action execution
//!
//! The executor is the only path by which transactions are created:
//! capture state, run the action, capture state again, record. It depends
//! only on a state-reader callable (or the generic [`ResourceStore`]
//! contract), so the same logic runs against a shadow store or a production
//! one.

use crate::error::{ActionFailure, LedgerError, RestoreError};
use crate::ledger::TransactionLedger;
use crate::transaction::{ActionTarget, RollbackReceipt, TransactionId};
use keel_store::{Record, ResourceId, ResourceStore};
use std::fmt::Display;
use std::sync::Arc;

/// Outcome of an executed action
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome<T> {
    /// Action succeeded and was recorded
    Completed {
        /// Value returned by the action
        result: T,
        /// Handle for a later rollback
        transaction_id: TransactionId,
    },
    /// Action failed; nothing was recorded
    Failed {
        /// Failure description
        error: String,
    },
}

impl<T> ActionOutcome<T> {
    /// Whether the action succeeded
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Transaction recorded for a successful action
    #[inline]
    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Completed { transaction_id, .. } => Some(*transaction_id),
            Self::Failed { .. } => None,
        }
    }

    /// Action result, if it succeeded
    #[inline]
    #[must_use]
    pub fn result(&self) -> Option<&T> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Failed { .. } => None,
        }
    }

    /// Failure description, if it failed
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }

    /// Map the result value
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ActionOutcome<U> {
        match self {
            Self::Completed {
                result,
                transaction_id,
            } => ActionOutcome::Completed {
                result: f(result),
                transaction_id,
            },
            Self::Failed { error } => ActionOutcome::Failed { error },
        }
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    /// [`ActionFailure`] if the action failed
    pub fn into_result(self) -> Result<(T, TransactionId), ActionFailure> {
        match self {
            Self::Completed {
                result,
                transaction_id,
            } => Ok((result, transaction_id)),
            Self::Failed { error } => Err(ActionFailure(error)),
        }
    }
}

/// Wraps destructive actions with ledger recording
#[derive(Debug, Clone, Default)]
pub struct ActionExecutor {
    ledger: Arc<TransactionLedger>,
}

impl ActionExecutor {
    /// Create executor recording into `ledger`
    #[inline]
    #[must_use]
    pub fn new(ledger: Arc<TransactionLedger>) -> Self {
        Self { ledger }
    }

    /// Ledger this executor records into
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }

    /// Execute `action`, recording a transaction if it succeeds
    ///
    /// `get_state` is called strictly before and strictly after the
    /// action. If the action fails, no transaction is recorded and no
    /// cleanup is attempted; the action owns its own atomicity.
    pub fn execute<T, E, A, G>(
        &self,
        target: ActionTarget,
        action: A,
        get_state: G,
    ) -> ActionOutcome<T>
    where
        E: Display,
        A: FnOnce() -> Result<T, E>,
        G: Fn(&ResourceId) -> Option<Record>,
    {
        let previous_state = get_state(&target.resource_id);
        self.run_and_record(target, previous_state, action, get_state)
    }

    /// Execute `action` against `store`, reading state through the store
    ///
    /// A lookup miss before the action means the resource did not exist.
    /// Any other read failure before the action fails the call without
    /// running the action. A read failure after the action still records
    /// the transaction, with `new_state` left uncaptured.
    pub fn execute_on<S, T, E, A>(
        &self,
        store: &S,
        target: ActionTarget,
        action: A,
    ) -> ActionOutcome<T>
    where
        S: ResourceStore + ?Sized,
        E: Display,
        A: FnOnce(&S) -> Result<T, E>,
    {
        let kind = target.resource_kind.clone();
        let previous_state = match store.current(&kind, &target.resource_id) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    %kind,
                    resource_id = %target.resource_id,
                    error = %e,
                    "Previous state unreadable, action not run"
                );
                return ActionOutcome::Failed {
                    error: format!("previous state capture failed: {e}"),
                };
            }
        };

        self.run_and_record(
            target,
            previous_state,
            || action(store),
            |id| match store.current(&kind, id) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(%kind, resource_id = %id, error = %e, "New state not captured");
                    None
                }
            },
        )
    }

    fn run_and_record<T, E, A, G>(
        &self,
        target: ActionTarget,
        previous_state: Option<Record>,
        action: A,
        get_state: G,
    ) -> ActionOutcome<T>
    where
        E: Display,
        A: FnOnce() -> Result<T, E>,
        G: FnOnce(&ResourceId) -> Option<Record>,
    {
        let result = match action() {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    action = %target.action,
                    kind = %target.resource_kind,
                    resource_id = %target.resource_id,
                    error = %e,
                    "Action failed, no transaction recorded"
                );
                return ActionOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let new_state = get_state(&target.resource_id);
        let transaction_id = self.ledger.record(target, previous_state, new_state);

        ActionOutcome::Completed {
            result,
            transaction_id,
        }
    }

    /// Mark a transaction rolled back and report what to restore
    ///
    /// # Errors
    /// See [`TransactionLedger::rollback`]
    pub fn rollback(&self, id: &TransactionId) -> Result<RollbackReceipt, LedgerError> {
        self.ledger.rollback(id)
    }

    /// Re-apply a transaction's previous state to `store`, then mark it
    /// rolled back
    ///
    /// A resource that did not exist before the action is deleted; any
    /// other is written back verbatim through [`ResourceStore::restore`].
    ///
    /// # Errors
    /// - [`RestoreError::Ledger`] for unknown or already rolled back ids
    /// - [`RestoreError::Store`] if the store rejects the write; the
    ///   transaction then stays completed
    pub fn rollback_and_restore<S>(
        &self,
        id: &TransactionId,
        store: &S,
    ) -> Result<RollbackReceipt, RestoreError>
    where
        S: ResourceStore + ?Sized,
    {
        self.ledger.rollback_with::<RestoreError, _>(id, |tx| {
            let kind = tx.resource_kind();
            let resource_id = tx.resource_id();
            match tx.previous_state() {
                Some(previous) => {
                    store.restore(kind, resource_id, previous.clone())?;
                }
                None => {
                    store.delete(kind, resource_id)?;
                }
            }
            tracing::info!(transaction_id = %id, %kind, %resource_id, "Previous state restored");
            Ok(())
        })
    }
}
