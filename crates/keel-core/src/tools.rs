//! Document and form tools
//!
//! The operations an agent calls to change documents and forms. Every
//! mutation runs through the [`ActionExecutor`], so each one yields a
//! transaction id that can later be rolled back or undone.

use crate::config::StoreConfig;
use crate::error::{KeelError, KeelResult};
use keel_ledger::{
    ActionExecutor, ActionKind, ActionTarget, ClientId, RollbackReceipt, TransactionId,
};
use keel_store::{Record, ResourceId, ResourceKind, ResourceStore, ShadowStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Status given to newly created documents
pub const DRAFT_STATUS: &str = "draft";

/// Result of a mutating tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolReceipt<T> {
    /// Resource the tool acted on
    pub resource_id: ResourceId,
    /// Value produced by the store
    pub result: T,
    /// Handle for rollback
    pub transaction_id: TransactionId,
}

/// Fields for a new document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Document type, e.g. `regulatory` or `clinical`
    pub document_type: String,
    /// Title
    pub title: String,
    /// Body text
    pub content: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Record,
}

impl NewDocument {
    /// Create document description
    #[must_use]
    pub fn new(
        document_type: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_type: document_type.into(),
            title: title.into(),
            content: content.into(),
            metadata: Record::new(),
        }
    }

    /// Attach metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Record) -> Self {
        self.metadata = metadata;
        self
    }

    fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("type".into(), Value::String(self.document_type));
        record.insert("title".into(), Value::String(self.title));
        record.insert("content".into(), Value::String(self.content));
        record.insert("metadata".into(), Value::Object(self.metadata));
        record.insert("status".into(), Value::String(DRAFT_STATUS.into()));
        record
    }
}

/// Changes to an existing document
///
/// Empty content and empty metadata are treated as "no change".
/// Metadata is merged key by key into the existing metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    /// Replacement body text
    pub content: Option<String>,
    /// Metadata keys to set
    pub metadata: Option<Record>,
}

impl DocumentUpdate {
    /// Replace content
    #[inline]
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Merge metadata
    #[inline]
    #[must_use]
    pub fn metadata(mut self, metadata: Record) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn into_fields(self, current: &Record) -> Record {
        let mut fields = Record::new();
        if let Some(content) = self.content.filter(|c| !c.is_empty()) {
            fields.insert("content".into(), Value::String(content));
        }
        if let Some(updates) = self.metadata.filter(|m| !m.is_empty()) {
            let mut merged = match current.get("metadata") {
                Some(Value::Object(existing)) => existing.clone(),
                _ => Record::new(),
            };
            merged.extend(updates);
            fields.insert("metadata".into(), Value::Object(merged));
        }
        fields
    }
}

/// Agent-facing tools over one store and one executor
#[derive(Debug)]
pub struct DocumentTools<S: ResourceStore> {
    store: Arc<S>,
    executor: ActionExecutor,
    documents: ResourceKind,
    forms: ResourceKind,
    client_id: Option<ClientId>,
}

impl<S: ResourceStore> Clone for DocumentTools<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            executor: self.executor.clone(),
            documents: self.documents.clone(),
            forms: self.forms.clone(),
            client_id: self.client_id.clone(),
        }
    }
}

impl<S: ResourceStore> DocumentTools<S> {
    /// Create tools over `store`, recording through `executor`
    #[must_use]
    pub fn new(store: Arc<S>, executor: ActionExecutor, kinds: &StoreConfig) -> Self {
        Self {
            store,
            executor,
            documents: ResourceKind::new(kinds.documents_kind.as_str()),
            forms: ResourceKind::new(kinds.forms_kind.as_str()),
            client_id: None,
        }
    }

    /// Attribute every recorded transaction to `client_id`
    #[inline]
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<ClientId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Executor the tools record through
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    fn target(&self, action: ActionKind, kind: &ResourceKind, id: &ResourceId) -> ActionTarget {
        ActionTarget::new(action, kind.clone(), id.clone()).with_client_opt(self.client_id.clone())
    }

    /// Fetch a document
    ///
    /// # Errors
    /// [`KeelError::Store`] with a not-found error if it does not exist
    pub fn get_document(&self, id: &ResourceId) -> KeelResult<Record> {
        Ok(self.store.get(&self.documents, id)?)
    }

    /// Create a draft document under a freshly generated id
    ///
    /// # Errors
    /// [`KeelError::Action`] if the store rejects the write
    pub fn create_document(&self, document: NewDocument) -> KeelResult<ToolReceipt<Record>> {
        let id = ResourceId::new(uuid::Uuid::new_v4().to_string());
        let fields = document.into_record();
        let target = self.target(ActionKind::Create, &self.documents, &id);

        let (result, transaction_id) = self
            .executor
            .execute_on(self.store.as_ref(), target, |s| s.create(&self.documents, &id, fields))
            .into_result()?;

        tracing::info!(document_id = %id, %transaction_id, "Document created");
        Ok(ToolReceipt {
            resource_id: id,
            result,
            transaction_id,
        })
    }

    /// Update content and/or metadata of an existing document
    ///
    /// # Errors
    /// - [`KeelError::Store`] not-found if the document does not exist
    /// - [`KeelError::Action`] if the store rejects the write
    pub fn update_document(
        &self,
        id: &ResourceId,
        update: DocumentUpdate,
    ) -> KeelResult<ToolReceipt<Record>> {
        let current = self.store.get(&self.documents, id)?;
        let fields = update.into_fields(&current);
        let target = self.target(ActionKind::Update, &self.documents, id);

        let (result, transaction_id) = self
            .executor
            .execute_on(self.store.as_ref(), target, |s| s.update(&self.documents, id, fields))
            .into_result()?;

        Ok(ToolReceipt {
            resource_id: id.clone(),
            result,
            transaction_id,
        })
    }

    /// Delete a document; the result says whether anything was removed
    ///
    /// # Errors
    /// [`KeelError::Action`] if the store rejects the delete
    pub fn delete_document(&self, id: &ResourceId) -> KeelResult<ToolReceipt<bool>> {
        let target = self.target(ActionKind::Delete, &self.documents, id);
        let (result, transaction_id) = self
            .executor
            .execute_on(self.store.as_ref(), target, |s| s.delete(&self.documents, id))
            .into_result()?;

        Ok(ToolReceipt {
            resource_id: id.clone(),
            result,
            transaction_id,
        })
    }

    /// Fetch a form
    ///
    /// # Errors
    /// [`KeelError::Store`] with a not-found error if it does not exist
    pub fn get_form(&self, id: &ResourceId) -> KeelResult<Record> {
        Ok(self.store.get(&self.forms, id)?)
    }

    /// Set `answers[question_id]` on a form
    ///
    /// # Errors
    /// - [`KeelError::Store`] not-found if the form does not exist
    /// - [`KeelError::InvalidInput`] for an empty question id
    /// - [`KeelError::Action`] if the store rejects the write
    pub fn update_form_answer(
        &self,
        form_id: &ResourceId,
        question_id: &str,
        answer: Value,
    ) -> KeelResult<ToolReceipt<Record>> {
        if question_id.is_empty() {
            return Err(KeelError::InvalidInput("question id must not be empty".into()));
        }
        self.store.get(&self.forms, form_id)?;
        let target = self.target(ActionKind::Update, &self.forms, form_id);

        let (result, transaction_id) = self
            .executor
            .execute_on(self.store.as_ref(), target, |s| {
                let form = s.get(&self.forms, form_id)?;
                let mut answers = match form.get("answers") {
                    Some(Value::Object(existing)) => existing.clone(),
                    _ => Record::new(),
                };
                answers.insert(question_id.to_string(), answer);

                let mut fields = Record::new();
                fields.insert("answers".into(), Value::Object(answers));
                s.update(&self.forms, form_id, fields)
            })
            .into_result()?;

        tracing::debug!(%form_id, question_id, %transaction_id, "Form answer updated");
        Ok(ToolReceipt {
            resource_id: form_id.clone(),
            result,
            transaction_id,
        })
    }

    /// Mark a transaction rolled back and report the state to restore
    ///
    /// # Errors
    /// [`KeelError::Ledger`] for unknown or already rolled back ids
    pub fn rollback_transaction(&self, id: &TransactionId) -> KeelResult<RollbackReceipt> {
        Ok(self.executor.rollback(id)?)
    }

    /// Roll a transaction back and re-apply its previous state to the store
    ///
    /// # Errors
    /// [`KeelError::Restore`] if the ledger rejects the rollback or the
    /// store rejects the write
    pub fn undo_transaction(&self, id: &TransactionId) -> KeelResult<RollbackReceipt> {
        Ok(self.executor.rollback_and_restore(id, self.store.as_ref())?)
    }
}

impl DocumentTools<ShadowStore> {
    /// Every document, in insertion order
    #[must_use]
    pub fn list_documents(&self) -> Vec<Record> {
        self.store.list(&self.documents)
    }

    /// Every form, in insertion order
    #[must_use]
    pub fn list_forms(&self) -> Vec<Record> {
        self.store.list(&self.forms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tools() -> DocumentTools<ShadowStore> {
        let mut form = Record::new();
        form.insert("name".into(), json!("Intake"));
        let store = ShadowStore::new();
        store
            .create(&"forms".into(), &"form-1".into(), form)
            .unwrap();
        DocumentTools::new(Arc::new(store), ActionExecutor::default(), &StoreConfig::default())
    }

    #[test]
    fn create_then_undo_removes_document() {
        let tools = tools();
        let receipt = tools
            .create_document(NewDocument::new("regulatory", "Summary", "Body"))
            .unwrap();
        assert_eq!(receipt.result["status"], "draft");

        tools.undo_transaction(&receipt.transaction_id).unwrap();
        assert!(tools.get_document(&receipt.resource_id).unwrap_err().is_not_found());
    }

    #[test]
    fn form_answer_initialises_answers() {
        let tools = tools();
        let receipt = tools
            .update_form_answer(&"form-1".into(), "q1", json!("Class II"))
            .unwrap();
        assert_eq!(receipt.result["answers"], json!({ "q1": "Class II" }));
        assert_eq!(receipt.result["name"], "Intake");
    }

    #[test]
    fn empty_update_fields_are_ignored() {
        let tools = tools();
        let created = tools
            .create_document(NewDocument::new("clinical", "Trial", "v1"))
            .unwrap();

        let updated = tools
            .update_document(&created.resource_id, DocumentUpdate::default().content(""))
            .unwrap();
        assert_eq!(updated.result["content"], "v1");
    }
}
