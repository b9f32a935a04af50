//! Error types for Keel Core

use crate::config::ConfigError;
use keel_context::ContextError;
use keel_ledger::{ActionFailure, LedgerError, RestoreError};
use keel_store::StoreError;

/// Main Keel error type
#[derive(Debug, thiserror::Error)]
pub enum KeelError {
    /// Store lookup or write failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Ledger rejected a rollback
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Rollback with restore failed
    #[error("restore failed: {0}")]
    Restore(#[from] RestoreError),

    /// Wrapped action failed; nothing was recorded
    #[error(transparent)]
    Action(#[from] ActionFailure),

    /// Context configuration or state error
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caller supplied an unusable argument
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl KeelError {
    /// Check if error is a lookup miss (resource or transaction)
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) | Self::Restore(RestoreError::Store(e)) => e.is_not_found(),
            Self::Ledger(LedgerError::NotFound(_))
            | Self::Restore(RestoreError::Ledger(LedgerError::NotFound(_))) => true,
            _ => false,
        }
    }

    /// Check if error is retryable
    ///
    /// Backend failures and failed actions may succeed on a later attempt;
    /// lookup misses and ledger rejections will not.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Backend(_))
                | Self::Restore(RestoreError::Store(StoreError::Backend(_)))
                | Self::Action(_)
        )
    }
}

/// Result type alias for Keel operations
pub type KeelResult<T> = Result<T, KeelError>;
