//! Addressing and record types shared by every store
//!
//! Records are addressed by `(ResourceKind, ResourceId)`. Identifiers are
//! unique only within their kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored record: string keys mapped to arbitrary JSON fields
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Field stamped on every record with its identifier
pub const ID_FIELD: &str = "id";
/// Field stamped by `create`
pub const CREATED_AT_FIELD: &str = "created_at";
/// Field stamped by `update`
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Name of a kind-scoped collection ("documents", "forms", ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(String);

impl ResourceKind {
    /// Create a kind from any string-like value
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// Borrow the kind name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a record within its kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create an identifier from any string-like value
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Mutation recorded in a store's operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Record inserted
    Create,
    /// Fields merged into an existing record
    Update,
    /// Record removed
    Delete,
    /// Record written back verbatim from an earlier snapshot
    Restore,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Restore => "restore",
        };
        f.write_str(name)
    }
}

/// One line of the operation log
///
/// Records *that* an operation happened. It carries no previous state and
/// cannot support rollback on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    /// What happened
    pub action: OperationKind,
    /// Collection touched
    pub kind: ResourceKind,
    /// Record touched
    pub id: ResourceId,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}

impl OperationLogEntry {
    /// Create entry stamped with the current time
    #[inline]
    #[must_use]
    pub fn now(action: OperationKind, kind: ResourceKind, id: ResourceId) -> Self {
        Self {
            action,
            kind,
            id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_verbatim() {
        assert_eq!(ResourceKind::from("documents").to_string(), "documents");
        assert_eq!(ResourceId::from("doc-1").as_str(), "doc-1");
    }

    #[test]
    fn operation_kind_serializes_snake_case() {
        let json = serde_json::to_string(&OperationKind::Restore).unwrap();
        assert_eq!(json, "\"restore\"");
    }

    #[test]
    fn kind_is_transparent_in_json() {
        let json = serde_json::to_string(&ResourceKind::new("forms")).unwrap();
        assert_eq!(json, "\"forms\"");
    }
}
