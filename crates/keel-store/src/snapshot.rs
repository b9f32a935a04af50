//! Full copies of store contents
//!
//! A snapshot owns its records outright. Cloning one is a deep copy, so a
//! live store and the snapshot it was seeded from never share a record.

use crate::error::{StoreError, StoreResult};
use crate::types::{Record, ResourceId, ResourceKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One kind-scoped collection, in insertion order
pub type Collection = IndexMap<ResourceId, Record>;

/// Records partitioned by kind: `{kind: {id: record}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot {
    collections: IndexMap<ResourceKind, Collection>,
}

impl StoreSnapshot {
    /// Create empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an exported snapshot
    ///
    /// # Errors
    /// [`StoreError::InvalidSnapshot`] unless the value is an object of
    /// objects of objects
    pub fn from_json(value: serde_json::Value) -> StoreResult<Self> {
        serde_json::from_value(value).map_err(|e| StoreError::InvalidSnapshot(e.to_string()))
    }

    /// Add a record, replacing any previous one with the same address
    #[must_use]
    pub fn with_record(
        mut self,
        kind: impl Into<ResourceKind>,
        id: impl Into<ResourceId>,
        record: Record,
    ) -> Self {
        self.insert(kind.into(), id.into(), record);
        self
    }

    /// Insert a record
    pub fn insert(&mut self, kind: ResourceKind, id: ResourceId, record: Record) {
        self.collections.entry(kind).or_default().insert(id, record);
    }

    /// Look up a record
    #[must_use]
    pub fn get(&self, kind: &ResourceKind, id: &ResourceId) -> Option<&Record> {
        self.collections.get(kind).and_then(|c| c.get(id))
    }

    /// Collection for a kind
    #[must_use]
    pub fn collection(&self, kind: &ResourceKind) -> Option<&Collection> {
        self.collections.get(kind)
    }

    pub(crate) fn collection_mut(&mut self, kind: &ResourceKind) -> Option<&mut Collection> {
        self.collections.get_mut(kind)
    }

    pub(crate) fn collection_or_insert(&mut self, kind: &ResourceKind) -> &mut Collection {
        self.collections.entry(kind.clone()).or_default()
    }

    /// Kinds present, in first-seen order
    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.collections.keys()
    }

    /// Total number of records across every kind
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.collections.values().map(IndexMap::len).sum()
    }

    /// Whether the snapshot holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_objects() {
        let snap = StoreSnapshot::from_json(json!({
            "documents": { "doc-1": { "title": "Intro" } },
            "forms": {}
        }))
        .unwrap();

        assert_eq!(snap.record_count(), 1);
        let doc = snap
            .get(&ResourceKind::new("documents"), &ResourceId::new("doc-1"))
            .unwrap();
        assert_eq!(doc["title"], "Intro");
        assert_eq!(snap.kinds().count(), 2);
    }

    #[test]
    fn rejects_non_object_records() {
        let err = StoreSnapshot::from_json(json!({ "documents": { "doc-1": 5 } })).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSnapshot(_)));
    }

    #[test]
    fn clone_does_not_alias() {
        let mut record = Record::new();
        record.insert("title".into(), json!("a"));
        let original = StoreSnapshot::new().with_record("documents", "d", record);

        let mut copy = original.clone();
        copy.collection_or_insert(&ResourceKind::new("documents"))
            .get_mut(&ResourceId::new("d"))
            .unwrap()
            .insert("title".into(), json!("b"));

        let title = &original
            .get(&ResourceKind::new("documents"), &ResourceId::new("d"))
            .unwrap()["title"];
        assert_eq!(title, "a");
    }
}
