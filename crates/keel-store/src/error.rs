//! Error types for resource stores

use crate::types::{ResourceId, ResourceKind};

/// Store operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Lookup miss
    #[error("{kind}/{id} not found")]
    NotFound {
        /// Collection searched
        kind: ResourceKind,
        /// Missing identifier
        id: ResourceId,
    },

    /// Snapshot input was not shaped as `{kind: {id: record}}`
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Failure reported by a backing (non-shadow) store
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create not-found error
    #[inline]
    pub fn not_found(kind: impl Into<ResourceKind>, id: impl Into<ResourceId>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Check if error is a lookup miss
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
