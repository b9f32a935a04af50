//! Per-run wiring
//!
//! An [`AgentRun`] owns everything one agent run mutates: a store, a
//! ledger, the executor recording into it, a context store and the tools
//! bound to all of them. Runs never share state, so evaluation runs can
//! execute side by side.

use crate::config::KeelConfig;
use crate::error::KeelResult;
use crate::tools::DocumentTools;
use keel_context::ContextStore;
use keel_ledger::{ActionExecutor, TransactionLedger};
use keel_store::{ResourceStore, ShadowStore, StoreSnapshot};
use std::sync::Arc;

/// State owned by a single agent run
#[derive(Debug)]
pub struct AgentRun<S: ResourceStore> {
    config: KeelConfig,
    store: Arc<S>,
    ledger: Arc<TransactionLedger>,
    tools: DocumentTools<S>,
    context: ContextStore,
}

impl AgentRun<ShadowStore> {
    /// Evaluation run over a shadow store seeded with `snapshot`
    ///
    /// # Errors
    /// [`KeelError::Config`](crate::KeelError::Config) if `config` is invalid
    pub fn shadow(config: KeelConfig, snapshot: StoreSnapshot) -> KeelResult<Self> {
        Self::with_store(config, Arc::new(ShadowStore::from_snapshot(snapshot)))
    }

    /// Return the shadow store to its seed and clear working memory
    ///
    /// The ledger keeps its history. Working memory keeps its tokenizer and
    /// scorer.
    pub fn reset(&mut self) {
        self.store.reset();
        self.context.clear();
    }
}

impl<S: ResourceStore> AgentRun<S> {
    /// Run over any store implementing the store contract
    ///
    /// # Errors
    /// [`KeelError::Config`](crate::KeelError::Config) if `config` is invalid
    pub fn with_store(config: KeelConfig, store: Arc<S>) -> KeelResult<Self> {
        config.validate()?;

        let ledger = Arc::new(TransactionLedger::new());
        let executor = ActionExecutor::new(Arc::clone(&ledger));
        let tools = DocumentTools::new(Arc::clone(&store), executor, &config.store);
        let context = ContextStore::new(config.context.clone());

        tracing::debug!(window_limit = config.context.window_limit, "Agent run created");
        Ok(Self {
            config,
            store,
            ledger,
            tools,
            context,
        })
    }

    /// Attribute every transaction of this run to `client_id`
    #[must_use]
    pub fn with_client(mut self, client_id: &str) -> Self {
        self.tools = self.tools.with_client(client_id);
        self
    }

    /// Use `context` as working memory
    ///
    /// The run's context configuration follows the store's.
    #[must_use]
    pub fn with_context(mut self, context: ContextStore) -> Self {
        self.config.context = context.config().clone();
        self.context = context;
        self
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &KeelConfig {
        &self.config
    }

    /// Store the run mutates
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Ledger of this run
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &Arc<TransactionLedger> {
        &self.ledger
    }

    /// Executor recording into this run's ledger
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &ActionExecutor {
        self.tools.executor()
    }

    /// Document and form tools
    #[inline]
    #[must_use]
    pub fn tools(&self) -> &DocumentTools<S> {
        &self.tools
    }

    /// Working memory
    #[inline]
    #[must_use]
    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    /// Working memory, mutable
    #[inline]
    pub fn context_mut(&mut self) -> &mut ContextStore {
        &mut self.context
    }

    /// Compress working memory if it crossed the threshold
    ///
    /// Returns whether a compression pass ran.
    pub fn maybe_compress(&mut self) -> bool {
        self.context.compress_in_place()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::NewDocument;
    use keel_context::PreservedScorer;

    #[test]
    fn runs_do_not_share_state() {
        let a = AgentRun::shadow(KeelConfig::default(), StoreSnapshot::new()).unwrap();
        let b = AgentRun::shadow(KeelConfig::default(), StoreSnapshot::new()).unwrap();

        a.tools()
            .create_document(NewDocument::new("regulatory", "A", "only in a"))
            .unwrap();

        assert_eq!(a.ledger().len(), 1);
        assert!(b.ledger().is_empty());
        assert!(b.tools().list_documents().is_empty());
    }

    #[test]
    fn reset_restores_seed_and_clears_context() {
        let mut run = AgentRun::shadow(KeelConfig::default(), StoreSnapshot::new()).unwrap();
        run.tools()
            .create_document(NewDocument::new("regulatory", "A", "body"))
            .unwrap();
        run.context_mut().add_content("draft", "body", 1.0);

        run.reset();

        assert!(run.tools().list_documents().is_empty());
        assert!(run.store().log().is_empty());
        assert_eq!(run.context().total_tokens(), 0);
        assert_eq!(run.ledger().len(), 1);
    }

    #[test]
    fn reset_keeps_custom_scorer() {
        let context = ContextStore::default().with_scorer(Arc::new(PreservedScorer));
        let mut run = AgentRun::shadow(KeelConfig::default(), StoreSnapshot::new())
            .unwrap()
            .with_context(context);
        run.context_mut().add_content("draft", "body", 0.9);

        run.reset();

        assert_eq!(run.context().total_tokens(), 0);
        assert_eq!(run.context().scorer().name(), "preserved");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = KeelConfig::default();
        config.context.window_limit = 0;
        assert!(AgentRun::shadow(config, StoreSnapshot::new()).is_err());
    }
}
