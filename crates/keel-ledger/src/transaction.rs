//! Transaction records
//!
//! A [`Transaction`] captures one destructive action: the resource it hit
//! and the resource's state immediately before and after. Once written, only
//! its status may change, exactly once, from `Completed` to `RolledBack`.

use chrono::{DateTime, Utc};
use keel_store::{Record, ResourceId, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Generate new transaction ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Opaque owning-client identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Create client ID
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

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of destructive action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// New resource written
    Create,
    /// Existing resource modified
    Update,
    /// Resource removed
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Unrecognised action name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action kind: '{0}'")]
pub struct UnknownActionKind(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" | "write" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(UnknownActionKind(other.to_string())),
        }
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Action applied and not undone
    Completed,
    /// Undone; terminal
    RolledBack,
}

/// What an action is about to do, and to which resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTarget {
    /// Action kind
    pub action: ActionKind,
    /// Collection of the resource
    pub resource_kind: ResourceKind,
    /// Identifier of the resource
    pub resource_id: ResourceId,
    /// Owning client, if any
    pub client_id: Option<ClientId>,
}

impl ActionTarget {
    /// Create target without a client
    #[inline]
    #[must_use]
    pub fn new(
        action: ActionKind,
        resource_kind: impl Into<ResourceKind>,
        resource_id: impl Into<ResourceId>,
    ) -> Self {
        Self {
            action,
            resource_kind: resource_kind.into(),
            resource_id: resource_id.into(),
            client_id: None,
        }
    }

    /// With owning client
    #[inline]
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<ClientId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// With optional owning client
    #[inline]
    #[must_use]
    pub fn with_client_opt(mut self, client_id: Option<ClientId>) -> Self {
        self.client_id = client_id;
        self
    }
}

/// Before/after record of one destructive action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    transaction_id: TransactionId,
    action: ActionKind,
    resource_kind: ResourceKind,
    resource_id: ResourceId,
    previous_state: Option<Record>,
    new_state: Option<Record>,
    timestamp: DateTime<Utc>,
    status: TransactionStatus,
    client_id: Option<ClientId>,
    sequence: u64,
}

impl Transaction {
    pub(crate) fn new(
        target: ActionTarget,
        previous_state: Option<Record>,
        new_state: Option<Record>,
        sequence: u64,
    ) -> Self {
        Self {
            transaction_id: TransactionId::new(),
            action: target.action,
            resource_kind: target.resource_kind,
            resource_id: target.resource_id,
            previous_state,
            new_state,
            timestamp: Utc::now(),
            status: TransactionStatus::Completed,
            client_id: target.client_id,
            sequence,
        }
    }

    /// Transaction identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Action kind
    #[inline]
    #[must_use]
    pub fn action(&self) -> ActionKind {
        self.action
    }

    /// Collection of the resource
    #[inline]
    #[must_use]
    pub fn resource_kind(&self) -> &ResourceKind {
        &self.resource_kind
    }

    /// Identifier of the resource
    #[inline]
    #[must_use]
    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// State before the action; `None` if the resource did not exist
    #[inline]
    #[must_use]
    pub fn previous_state(&self) -> Option<&Record> {
        self.previous_state.as_ref()
    }

    /// State after the action; `None` if the resource no longer exists
    #[inline]
    #[must_use]
    pub fn new_state(&self) -> Option<&Record> {
        self.new_state.as_ref()
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Owning client
    #[inline]
    #[must_use]
    pub fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    /// Ledger insertion order
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether this transaction can still be rolled back
    #[inline]
    #[must_use]
    pub fn is_rolled_back(&self) -> bool {
        self.status == TransactionStatus::RolledBack
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.status = TransactionStatus::RolledBack;
    }

    pub(crate) fn receipt(&self) -> RollbackReceipt {
        RollbackReceipt {
            transaction_id: self.transaction_id,
            previous_state: self.previous_state.clone(),
            action: self.action,
            resource_kind: self.resource_kind.clone(),
            resource_id: self.resource_id.clone(),
        }
    }
}

/// What to restore after a rollback
///
/// The ledger never touches a store; callers re-apply `previous_state`
/// through the same store they used for the original action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackReceipt {
    /// Transaction rolled back
    pub transaction_id: TransactionId,
    /// State to re-apply; `None` means the resource should not exist
    pub previous_state: Option<Record>,
    /// Action that was undone
    pub action: ActionKind,
    /// Collection of the resource
    pub resource_kind: ResourceKind,
    /// Identifier of the resource
    pub resource_id: ResourceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_parses_write_alias() {
        assert_eq!("write".parse::<ActionKind>().unwrap(), ActionKind::Create);
        assert_eq!("delete".parse::<ActionKind>().unwrap(), ActionKind::Delete);
        assert!("drop".parse::<ActionKind>().is_err());
    }

    #[test]
    fn transaction_id_round_trips_through_display() {
        let id = TransactionId::new();
        assert_eq!(id.to_string().parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn new_transaction_is_completed() {
        let tx = Transaction::new(
            ActionTarget::new(ActionKind::Update, "forms", "f-1").with_client("acme"),
            None,
            Some(Record::new()),
            0,
        );
        assert_eq!(tx.status(), TransactionStatus::Completed);
        assert_eq!(tx.client_id().unwrap().as_str(), "acme");
        assert!(tx.previous_state().is_none());
    }
}
