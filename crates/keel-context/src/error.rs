//! Context error types

use thiserror::Error;

/// Errors from context configuration and state handling
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContextError {
    /// Configuration value out of range
    #[error("invalid context config: {field} {reason}")]
    InvalidConfig {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ContextError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for context operations
pub type ContextResult<T> = Result<T, ContextError>;
