//! The store contract
//!
//! Implemented by [`ShadowStore`](crate::ShadowStore) and by any production
//! store an agent targets. Action execution depends only on this shape, so
//! the same logic runs unmodified against either.

use crate::error::{StoreError, StoreResult};
use crate::types::{Record, ResourceId, ResourceKind};
use std::sync::Arc;

/// Generic keyed record store
///
/// Methods take `&self`; implementations serialise concurrent callers
/// internally.
pub trait ResourceStore: Send + Sync {
    /// Read a record. Never logged.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the record does not exist
    fn get(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<Record>;

    /// Insert a record, stamping its identifier and creation time
    ///
    /// # Errors
    /// Backend failures only; the shadow store never fails here
    fn create(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record>;

    /// Merge fields into a record, stamping its update time
    ///
    /// Upsert: a missing record is created instead.
    ///
    /// # Errors
    /// Backend failures only; the shadow store never fails here
    fn update(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record>;

    /// Remove a record, returning whether it existed
    ///
    /// # Errors
    /// Backend failures only; the shadow store never fails here
    fn delete(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<bool>;

    /// Write a record back verbatim, without stamping
    ///
    /// Used to re-apply a previously captured snapshot. The default goes
    /// through `delete` + `create`, which re-stamps the creation time;
    /// stores that can write verbatim should override it.
    ///
    /// # Errors
    /// Backend failures only
    fn restore(&self, kind: &ResourceKind, id: &ResourceId, record: Record) -> StoreResult<Record> {
        self.delete(kind, id)?;
        self.create(kind, id, record)
    }

    /// Current state of a record, `None` when absent
    ///
    /// # Errors
    /// Any failure other than a lookup miss
    fn current(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<Option<Record>> {
        match self.get(kind, id) {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<S: ResourceStore + ?Sized> ResourceStore for Arc<S> {
    fn get(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<Record> {
        (**self).get(kind, id)
    }

    fn create(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record> {
        (**self).create(kind, id, fields)
    }

    fn update(&self, kind: &ResourceKind, id: &ResourceId, fields: Record) -> StoreResult<Record> {
        (**self).update(kind, id, fields)
    }

    fn delete(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<bool> {
        (**self).delete(kind, id)
    }

    fn restore(&self, kind: &ResourceKind, id: &ResourceId, record: Record) -> StoreResult<Record> {
        (**self).restore(kind, id, record)
    }

    fn current(&self, kind: &ResourceKind, id: &ResourceId) -> StoreResult<Option<Record>> {
        (**self).current(kind, id)
    }
}
