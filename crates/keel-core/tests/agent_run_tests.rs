//! End-to-end agent runs over seeded shadow stores

use keel_core::prelude::*;
use keel_core::tools::DocumentUpdate;
use keel_ledger::{ActionKind, LedgerError, RestoreError, TransactionFilter};
use keel_store::ResourceId;
use keel_test_utils::{record, seed_snapshot, words, RejectingStore};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn seeded_run() -> AgentRun<ShadowStore> {
    AgentRun::shadow(KeelConfig::default(), seed_snapshot())
        .unwrap()
        .with_client("acme")
}

#[test]
fn update_document_merges_metadata() {
    let run = seeded_run();
    let id = ResourceId::new("doc-1");
    run.tools()
        .update_document(&id, DocumentUpdate::default().metadata(record(json!({ "owner": "qa" }))))
        .unwrap();
    let receipt = run
        .tools()
        .update_document(
            &id,
            DocumentUpdate::default()
                .content("K123456 only")
                .metadata(record(json!({ "reviewed": true }))),
        )
        .unwrap();

    assert_eq!(receipt.result["content"], "K123456 only");
    assert_eq!(receipt.result["metadata"], json!({ "owner": "qa", "reviewed": true }));
    assert_eq!(receipt.result["title"], "Predicate devices");
    assert!(receipt.result.contains_key("updated_at"));
}

#[test]
fn missing_resources_are_not_found_and_unrecorded() {
    let run = seeded_run();

    let err = run
        .tools()
        .update_document(&"doc-404".into(), DocumentUpdate::default().content("x"))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = run
        .tools()
        .update_form_answer(&"form-404".into(), "q1", json!("yes"))
        .unwrap_err();
    assert!(err.is_not_found());

    assert!(run.ledger().is_empty());
}

#[test]
fn undo_restores_form_answers() {
    let run = seeded_run();
    let form = ResourceId::new("form-1");
    let before = run.tools().get_form(&form).unwrap();

    let receipt = run
        .tools()
        .update_form_answer(&form, "q2", json!("Yes"))
        .unwrap();
    assert_eq!(receipt.result["answers"], json!({ "q1": "Class II", "q2": "Yes" }));

    run.tools().undo_transaction(&receipt.transaction_id).unwrap();
    assert_eq!(run.tools().get_form(&form).unwrap(), before);
}

#[test]
fn report_only_rollback_blocks_later_undo() {
    let run = seeded_run();
    let receipt = run
        .tools()
        .delete_document(&"doc-2".into())
        .unwrap();
    assert!(receipt.result);

    let rollback = run.tools().rollback_transaction(&receipt.transaction_id).unwrap();
    assert_eq!(rollback.action, ActionKind::Delete);
    assert_eq!(rollback.previous_state.unwrap()["title"], "Clinical summary");

    let err = run.tools().undo_transaction(&receipt.transaction_id).unwrap_err();
    assert!(matches!(
        err,
        KeelError::Restore(RestoreError::Ledger(LedgerError::AlreadyRolledBack(_)))
    ));
    assert_eq!(run.tools().list_documents().len(), 1);
}

#[test]
fn transactions_are_attributed_to_client() {
    let run = seeded_run();
    run.tools()
        .create_document(NewDocument::new("clinical", "Study", "Results"))
        .unwrap();
    run.tools()
        .update_form_answer(&"form-1".into(), "q3", json!(3))
        .unwrap();

    let mine = run.ledger().list(&TransactionFilter::all().client("acme"));
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].action(), ActionKind::Update);
    assert!(run
        .ledger()
        .list(&TransactionFilter::all().client("globex"))
        .is_empty());
}

#[test]
fn rejecting_store_surfaces_action_failure() {
    let run = AgentRun::with_store(KeelConfig::default(), Arc::new(RejectingStore)).unwrap();
    let err = run
        .tools()
        .create_document(NewDocument::new("regulatory", "T", "C"))
        .unwrap_err();

    assert!(matches!(err, KeelError::Action(_)));
    assert!(err.is_retryable());
    assert!(run.ledger().is_empty());
}

#[test]
fn maybe_compress_bounds_working_memory() {
    let context = ContextConfig::default().with_window_limit(300);
    let config = KeelConfig::default().with_context(context);
    let mut run = AgentRun::shadow(config, seed_snapshot()).unwrap();

    for i in 0..3 {
        run.context_mut().add_content("research", words(&format!("r{i}w"), 40), 1.0);
    }
    assert!(!run.maybe_compress());

    for i in 0..3 {
        run.context_mut().add_content("draft", words(&format!("d{i}w"), 40), 1.0);
    }
    assert!(run.maybe_compress());
    assert!(run.context().total_tokens() <= 150);
    assert_eq!(
        run.context().segment_names().collect::<Vec<_>>(),
        vec!["research", "draft"]
    );
}
