//! Testing utilities for Keel workspace
//!
//! Shared fixtures: seed snapshots shaped like a production export, record
//! builders and a store that fails every write.

#![allow(missing_docs)]

use keel_store::{Record, ResourceId, ResourceKind, ResourceStore, StoreError, StoreSnapshot};
use serde_json::{json, Value};

pub const DOCUMENTS: &str = "documents";
pub const FORMS: &str = "forms";

/// Build a record from a JSON object literal
///
/// # Panics
/// If `value` is not an object
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture record must be a JSON object, got {other}"),
    }
}

pub fn document_record(id: &str, title: &str, content: &str) -> Record {
    record(json!({
        "id": id,
        "type": "regulatory",
        "title": title,
        "content": content,
        "metadata": {},
        "status": "draft",
    }))
}

pub fn form_record(id: &str) -> Record {
    record(json!({
        "id": id,
        "name": "510(k) submission",
        "answers": { "q1": "Class II" },
    }))
}

/// Two documents and one form
pub fn seed_snapshot() -> StoreSnapshot {
    StoreSnapshot::new()
        .with_record(
            DOCUMENTS,
            "doc-1",
            document_record("doc-1", "Predicate devices", "K123456 and K654321"),
        )
        .with_record(
            DOCUMENTS,
            "doc-2",
            document_record("doc-2", "Clinical summary", "No adverse events"),
        )
        .with_record(FORMS, "form-1", form_record("form-1"))
}

/// `n` words separated by single spaces: exactly `n` tokens
pub fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Store that reads as empty and rejects every write
#[derive(Debug, Default)]
pub struct RejectingStore;

impl ResourceStore for RejectingStore {
    fn get(&self, kind: &ResourceKind, id: &ResourceId) -> Result<Record, StoreError> {
        Err(StoreError::not_found(kind.clone(), id.clone()))
    }

    fn create(&self, _: &ResourceKind, _: &ResourceId, _: Record) -> Result<Record, StoreError> {
        Err(StoreError::Backend("writes disabled".into()))
    }

    fn update(&self, _: &ResourceKind, _: &ResourceId, _: Record) -> Result<Record, StoreError> {
        Err(StoreError::Backend("writes disabled".into()))
    }

    fn delete(&self, _: &ResourceKind, _: &ResourceId) -> Result<bool, StoreError> {
        Err(StoreError::Backend("writes disabled".into()))
    }
}
