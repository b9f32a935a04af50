//! Isolated, resettable shadow store
//!
//! Mimics a production store for evaluation runs. Every write lands in
//! process memory only and is recorded in an operation log; `reset` brings
//! back the exact contents captured at construction.

use crate::error::{StoreError, StoreResult};
use crate::snapshot::StoreSnapshot;
use crate::store::ResourceStore;
use crate::types::{
    OperationKind, OperationLogEntry, Record, ResourceId, ResourceKind, CREATED_AT_FIELD,
    ID_FIELD, UPDATED_AT_FIELD,
};
use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;
use serde_json::Value;

#[derive(Debug, Default)]
struct ShadowState {
    data: StoreSnapshot,
    log: Vec<OperationLogEntry>,
}

impl ShadowState {
    fn append(&mut self, action: OperationKind, kind: &ResourceKind, id: &ResourceId) {
        self.log
            .push(OperationLogEntry::now(action, kind.clone(), id.clone()));
    }

    fn create(&mut self, kind: &ResourceKind, id: &ResourceId, mut fields: Record) -> Record {
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        fields.insert(CREATED_AT_FIELD.to_string(), Value::String(timestamp()));
        self.data
            .collection_or_insert(kind)
            .insert(id.clone(), fields.clone());
        self.append(OperationKind::Create, kind, id);
        fields
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// In-memory store seeded from a snapshot
///
/// # Invariants
/// - The initial snapshot is never mutated after construction
/// - Live data and the initial snapshot never share a record
/// - Reads never touch the operation log
#[derive(Debug, Default)]
pub struct ShadowStore {
    initial: StoreSnapshot,
    state: RwLock<ShadowState>,
}

impl ShadowStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store seeded with a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let live = snapshot.clone();
        tracing::debug!(records = snapshot.record_count(), "Shadow store seeded");
        Self {
            initial: snapshot,
            state: RwLock::new(ShadowState {
                data: live,
                log: Vec::new(),
            }),
        }
    }

    /// Create store from an exported `{kind: {id: record}}` JSON snapshot
    ///
    /// # Errors
    /// [`StoreError::InvalidSnapshot`] if the value is not shaped correctly
    pub fn from_json(value: Value) -> StoreResult<Self> {
        StoreSnapshot::from_json(value).map(Self::from_snapshot)
    }

    /// Discard every mutation and clear the operation log
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.data = self.initial.clone();
        let discarded = std::mem::take(&mut state.log).len();
        tracing::info!(discarded_operations = discarded, "Shadow store reset");
    }

    /// Operation log, oldest first
    #[must_use]
    pub fn log(&self) -> Vec<OperationLogEntry> {
        self.state.read().log.clone()
    }

    /// Every record of a kind, in insertion order
    #[must_use]
    pub fn list(&self, kind: &ResourceKind) -> Vec<Record> {
        self.state
            .read()
            .data
            .collection(kind)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Kinds currently holding a collection
    #[must_use]
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.state.read().data.kinds().cloned().collect()
    }

    /// Deep copy of the live contents
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().data.clone()
    }

    /// Contents captured at construction
    #[inline]
    #[must_use]
    pub fn initial_snapshot(&self) -> &StoreSnapshot {
        &self.initial
    }
}

impl ResourceStore for ShadowStore {
    fn get(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<Record> {
        self.state
            .read()
            .data
            .get(kind, id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind.clone(), id.clone()))
    }

    fn create(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record> {
        let record = self.state.write().create(kind, id, fields);
        tracing::debug!(%kind, %id, "Shadow create");
        Ok(record)
    }

    fn update(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record> {
        let mut state = self.state.write();

        if state.data.get(kind, id).is_none() {
            tracing::debug!(%kind, %id, "Shadow update of missing record, creating");
            return Ok(state.create(kind, id, fields));
        }

        let record = {
            let collection = state.data.collection_or_insert(kind);
            let existing = collection.entry(id.clone()).or_default();
            existing.extend(fields);
            existing.insert(UPDATED_AT_FIELD.to_string(), Value::String(timestamp()));
            existing.clone()
        };

        state.append(OperationKind::Update, kind, id);
        tracing::debug!(%kind, %id, "Shadow update");
        Ok(record)
    }

    fn delete(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<bool> {
        let mut state = self.state.write();
        let removed = state
            .data
            .collection_mut(kind)
            .and_then(|c| c.shift_remove(id))
            .is_some();

        if removed {
            state.append(OperationKind::Delete, kind, id);
            tracing::debug!(%kind, %id, "Shadow delete");
        }
        Ok(removed)
    }

    fn restore(&self, kind: &ResourceKind, id: &ResourceId, record: Record) -> StoreResult<Record> {
        let mut state = self.state.write();
        state
            .data
            .collection_or_insert(kind)
            .insert(id.clone(), record.clone());
        state.append(OperationKind::Restore, kind, id);
        tracing::debug!(%kind, %id, "Shadow restore");
        Ok(record)
    }
}
