//! Rollback behaviour against a seeded shadow store
//!
//! Core guarantees exercised here:
//! - `rollback` hands back exactly the state captured before the action
//! - failed actions leave the ledger untouched
//! - rollback of an unknown id is a value, not a panic
//! - restore brings the store back to its pre-action contents

use keel_ledger::{
    ActionExecutor, ActionKind, ActionTarget, LedgerError, RestoreError, TransactionFilter,
    TransactionId, TransactionLedger,
};
use keel_store::{ResourceId, ResourceKind, ResourceStore, ShadowStore};
use keel_test_utils::{record, seed_snapshot, RejectingStore, DOCUMENTS, FORMS};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn docs() -> ResourceKind {
    ResourceKind::new(DOCUMENTS)
}

#[test]
fn rollback_reports_state_before_update() {
    let store = ShadowStore::from_snapshot(seed_snapshot());
    let executor = ActionExecutor::default();
    let before = store.get(&docs(), &"doc-1".into()).unwrap();

    let outcome = executor.execute_on(
        &store,
        ActionTarget::new(ActionKind::Update, DOCUMENTS, "doc-1").with_client("acme"),
        |s| s.update(&docs(), &"doc-1".into(), record(json!({ "status": "final" }))),
    );
    let id = outcome.transaction_id().unwrap();

    let receipt = executor.rollback(&id).unwrap();
    assert_eq!(receipt.previous_state, Some(before));
    assert_eq!(receipt.resource_kind, docs());
    assert_eq!(receipt.resource_id, ResourceId::new("doc-1"));

    // Report-only rollback leaves the store untouched
    assert_eq!(
        store.get(&docs(), &"doc-1".into()).unwrap()["status"],
        "final"
    );
}

#[test]
fn unknown_rollback_is_a_failure_value() {
    let ledger = TransactionLedger::new();
    let missing = TransactionId::new();
    assert_eq!(ledger.rollback(&missing), Err(LedgerError::NotFound(missing)));
}

#[test]
fn failed_action_leaves_ledger_size_unchanged() {
    let executor = ActionExecutor::default();
    let ok = executor.execute_on(
        &ShadowStore::new(),
        ActionTarget::new(ActionKind::Create, DOCUMENTS, "doc-9"),
        |s| s.create(&docs(), &"doc-9".into(), record(json!({}))),
    );
    assert!(ok.is_completed());
    let size = executor.ledger().len();

    let failed = executor.execute_on(
        &RejectingStore,
        ActionTarget::new(ActionKind::Create, DOCUMENTS, "doc-10"),
        |s| s.create(&docs(), &"doc-10".into(), record(json!({}))),
    );

    assert!(!failed.is_completed());
    assert!(failed.error().unwrap().contains("writes disabled"));
    assert_eq!(executor.ledger().len(), size);
}

#[test]
fn restore_after_delete_brings_record_back() {
    let store = ShadowStore::from_snapshot(seed_snapshot());
    let executor = ActionExecutor::default();
    let before = store.snapshot();

    let outcome = executor.execute_on(
        &store,
        ActionTarget::new(ActionKind::Delete, FORMS, "form-1"),
        |s| s.delete(&ResourceKind::new(FORMS), &"form-1".into()),
    );
    assert_eq!(outcome.result(), Some(&true));
    let id = outcome.transaction_id().unwrap();

    executor.rollback_and_restore(&id, &store).unwrap();
    assert_eq!(
        store.get(&ResourceKind::new(FORMS), &"form-1".into()).unwrap(),
        before
            .get(&ResourceKind::new(FORMS), &"form-1".into())
            .unwrap()
            .clone()
    );
}

#[test]
fn double_restore_is_rejected() {
    let store = ShadowStore::from_snapshot(seed_snapshot());
    let executor = ActionExecutor::default();
    let outcome = executor.execute_on(
        &store,
        ActionTarget::new(ActionKind::Update, DOCUMENTS, "doc-2"),
        |s| s.update(&docs(), &"doc-2".into(), record(json!({ "title": "x" }))),
    );
    let id = outcome.transaction_id().unwrap();

    executor.rollback_and_restore(&id, &store).unwrap();
    let log_len = store.log().len();

    let err = executor.rollback_and_restore(&id, &store).unwrap_err();
    assert_eq!(err, RestoreError::Ledger(LedgerError::AlreadyRolledBack(id)));
    assert_eq!(store.log().len(), log_len);
}

#[test]
fn shared_ledger_sees_all_executors() {
    let ledger = Arc::new(TransactionLedger::new());
    let a = ActionExecutor::new(Arc::clone(&ledger));
    let b = ActionExecutor::new(Arc::clone(&ledger));
    let store = ShadowStore::new();

    let _ = a.execute_on(
        &store,
        ActionTarget::new(ActionKind::Create, DOCUMENTS, "x").with_client("acme"),
        |s| s.create(&docs(), &"x".into(), record(json!({}))),
    );
    let _ = b.execute_on(
        &store,
        ActionTarget::new(ActionKind::Create, DOCUMENTS, "y").with_client("globex"),
        |s| s.create(&docs(), &"y".into(), record(json!({}))),
    );

    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.list(&TransactionFilter::all().client("globex")).len(), 1);
}

proptest! {
    #[test]
    fn prop_rollback_returns_recorded_previous_state(
        title in "[a-zA-Z ]{0,24}",
        revision in any::<u32>(),
        existed in any::<bool>(),
    ) {
        let ledger = TransactionLedger::new();
        let previous = existed.then(|| record(json!({ "title": title, "revision": revision })));

        let id = ledger.record(
            ActionTarget::new(ActionKind::Update, DOCUMENTS, "doc"),
            previous.clone(),
            Some(record(json!({ "title": "after" }))),
        );

        let receipt = ledger.rollback(&id).unwrap();
        prop_assert_eq!(receipt.previous_state, previous);
        prop_assert_eq!(receipt.resource_id.as_str(), "doc");
    }
}
