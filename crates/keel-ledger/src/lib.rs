//! Keel Ledger - transactions and rollback for destructive actions
//!
//! Every destructive action an agent performs goes through
//! [`ActionExecutor`], which captures the resource's state before and after
//! and records a [`Transaction`] in the [`TransactionLedger`]. A later
//! rollback either reports the previous state ([`TransactionLedger::rollback`])
//! or re-applies it to a store ([`ActionExecutor::rollback_and_restore`]).
//!
//! # Example
//!
//! ```rust
//! use keel_ledger::{ActionExecutor, ActionKind, ActionTarget};
//! use keel_store::{Record, ResourceStore, ShadowStore};
//!
//! let store = ShadowStore::new();
//! let executor = ActionExecutor::default();
//!
//! let outcome = executor.execute_on(
//!     &store,
//!     ActionTarget::new(ActionKind::Create, "documents", "doc-1"),
//!     |s| s.create(&"documents".into(), &"doc-1".into(), Record::new()),
//! );
//!
//! let id = outcome.transaction_id().unwrap();
//! executor.rollback_and_restore(&id, &store).unwrap();
//! assert!(store.get(&"documents".into(), &"doc-1".into()).is_err());
//! ```

pub mod error;
pub mod executor;
pub mod ledger;
pub mod transaction;

pub use error::{ActionFailure, LedgerError, RestoreError};
pub use executor::{ActionExecutor, ActionOutcome};
pub use ledger::{TransactionFilter, TransactionLedger};
pub use transaction::{
    ActionKind, ActionTarget, ClientId, RollbackReceipt, Transaction, TransactionId,
    TransactionStatus, UnknownActionKind,
};
