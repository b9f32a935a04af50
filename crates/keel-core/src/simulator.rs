//! Seeded rollback simulator
//!
//! Drives random create/update/delete/rollback sequences against isolated
//! shadow-store runs and checks, as it goes:
//! - rollback reports exactly the state captured before the action
//! - restore leaves the resource in that state
//! - a transaction is never rolled back twice
//! - failed actions record nothing and write nothing
//! - compression keeps working memory within its target
//! - reset returns the store to its seed with an empty log
//!
//! Runs are independent and execute in parallel; a run's outcome depends
//! only on the seed and its index.

use crate::config::KeelConfig;
use crate::error::KeelResult;
use crate::run::AgentRun;
use keel_context::ContextConfig;
use keel_ledger::{ActionKind, ActionTarget, LedgerError, RestoreError, TransactionId};
use keel_store::{
    Record, ResourceId, ResourceKind, ResourceStore, ShadowStore, StoreError, StoreSnapshot,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

const KINDS: [&str; 2] = ["documents", "forms"];

/// Simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Independent runs
    pub runs: usize,
    /// Operations per run
    pub steps_per_run: usize,
    /// Records of each kind in the seed snapshot
    pub seed_records: usize,
    /// Working memory settings for every run
    pub context: ContextConfig,
    /// Stop a run at its first violation
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            runs: 8,
            steps_per_run: 200,
            seed_records: 4,
            context: ContextConfig::default().with_window_limit(400),
            stop_on_first_violation: true,
        }
    }
}

/// One simulated step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SimulatedOperation {
    /// Create or overwrite a record
    Create {
        /// Collection
        kind: String,
        /// Record id
        id: String,
    },
    /// Upsert a revision field
    Update {
        /// Collection
        kind: String,
        /// Record id
        id: String,
        /// Value written
        revision: u32,
    },
    /// Delete a record
    Delete {
        /// Collection
        kind: String,
        /// Record id
        id: String,
    },
    /// Action that fails before writing
    FailingWrite {
        /// Collection
        kind: String,
        /// Record id
        id: String,
    },
    /// Report-only rollback of a recorded transaction
    Rollback {
        /// Index into the run's completed transactions
        index: usize,
    },
    /// Rollback with restore of a recorded transaction
    Restore {
        /// Index into the run's completed transactions
        index: usize,
    },
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Rollback reported a state other than the one captured before the action
    RollbackMismatch {
        /// Run index
        run: usize,
        /// Transaction rolled back
        transaction_id: String,
    },
    /// Resource state after restore differs from the captured previous state
    RestoreMismatch {
        /// Run index
        run: usize,
        /// Transaction restored
        transaction_id: String,
    },
    /// A second rollback of the same transaction was accepted
    DoubleRollbackAccepted {
        /// Run index
        run: usize,
        /// Transaction rolled back twice
        transaction_id: String,
    },
    /// A failed action changed the ledger or the store
    FailedActionRecorded {
        /// Run index
        run: usize,
        /// Step within the run
        step: usize,
    },
    /// Working memory exceeded the compression target after a pass
    ContextOverBudget {
        /// Run index
        run: usize,
        /// Tokens held after compression
        tokens: usize,
        /// Compression target
        target: usize,
    },
    /// Reset did not restore the seed or left log entries behind
    ResetLeak {
        /// Run index
        run: usize,
    },
    /// Operation returned an error it should not have
    UnexpectedOutcome {
        /// Run index
        run: usize,
        /// Operation attempted
        operation: SimulatedOperation,
        /// Error returned
        error: String,
    },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorStats {
    /// Runs executed
    pub runs: usize,
    /// Actions submitted to the executor
    pub actions_attempted: u64,
    /// Actions recorded as transactions
    pub actions_completed: u64,
    /// Actions that failed (injected)
    pub actions_failed: u64,
    /// Report-only rollbacks accepted
    pub rollbacks: u64,
    /// Rollbacks with restore accepted
    pub restores: u64,
    /// Rollbacks rejected because the transaction was already rolled back
    pub rejected_rollbacks: u64,
    /// Compression passes over working memory
    pub compressions: u64,
    /// Store writes logged before reset
    pub logged_writes: u64,
}

impl SimulatorStats {
    fn merge(&mut self, other: &Self) {
        self.runs += other.runs;
        self.actions_attempted += other.actions_attempted;
        self.actions_completed += other.actions_completed;
        self.actions_failed += other.actions_failed;
        self.rollbacks += other.rollbacks;
        self.restores += other.restores;
        self.rejected_rollbacks += other.rejected_rollbacks;
        self.compressions += other.compressions;
        self.logged_writes += other.logged_writes;
    }
}

/// Final report from simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorReport {
    /// Configuration the simulator ran with
    pub config: SimulatorConfig,
    /// Aggregate statistics
    pub stats: SimulatorStats,
    /// Violations, ordered by run
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        use std::fmt::Write as _;

        let mut report = String::new();
        let _ = writeln!(report, "=== Keel Rollback Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Runs: {}", self.stats.runs);
        let _ = writeln!(report, "Steps per Run: {}", self.config.steps_per_run);
        let _ = writeln!(report, "Actions Attempted: {}", self.stats.actions_attempted);
        let _ = writeln!(report, "Actions Completed: {}", self.stats.actions_completed);
        let _ = writeln!(report, "Actions Failed: {}", self.stats.actions_failed);
        let _ = writeln!(report, "Rollbacks: {}", self.stats.rollbacks);
        let _ = writeln!(report, "Restores: {}", self.stats.restores);
        let _ = writeln!(report, "Rejected Rollbacks: {}", self.stats.rejected_rollbacks);
        let _ = writeln!(report, "Compressions: {}", self.stats.compressions);
        let _ = writeln!(report, "Logged Writes: {}", self.stats.logged_writes);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator
///
/// # Errors
/// [`KeelError::Config`](crate::KeelError::Config) if the context
/// configuration is invalid (for example a zero window limit)
pub fn run_simulator(config: SimulatorConfig) -> KeelResult<SimulatorReport> {
    let keel_config = KeelConfig::default().with_context(config.context.clone());
    keel_config.validate()?;

    tracing::info!(
        seed = config.seed,
        runs = config.runs,
        steps = config.steps_per_run,
        window_limit = config.context.window_limit,
        "Simulator started"
    );

    let outcomes: Vec<KeelResult<RunOutcome>> = (0..config.runs)
        .into_par_iter()
        .map(|run| simulate_run(&config, &keel_config, run))
        .collect();

    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();
    for outcome in outcomes {
        let outcome = outcome?;
        stats.merge(&outcome.stats);
        violations.extend(outcome.violations);
    }

    tracing::info!(violations = violations.len(), "Simulator finished");
    Ok(SimulatorReport {
        config,
        stats,
        violations,
    })
}

struct RunOutcome {
    stats: SimulatorStats,
    violations: Vec<Violation>,
}

/// Seed snapshot with `n` documents and `n` forms
fn seed_snapshot(n: usize) -> StoreSnapshot {
    let mut snapshot = StoreSnapshot::new();
    for i in 0..n {
        let doc_id = format!("documents-{i}");
        let mut document = Record::new();
        document.insert("id".into(), json!(doc_id));
        document.insert("title".into(), json!(format!("Document {i}")));
        document.insert("status".into(), json!("draft"));
        snapshot = snapshot.with_record("documents", doc_id.as_str(), document);

        let form_id = format!("forms-{i}");
        let mut form = Record::new();
        form.insert("id".into(), json!(form_id));
        form.insert("answers".into(), json!({}));
        snapshot = snapshot.with_record("forms", form_id.as_str(), form);
    }
    snapshot
}

fn simulate_run(
    config: &SimulatorConfig,
    keel_config: &KeelConfig,
    run: usize,
) -> KeelResult<RunOutcome> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(run as u64));
    let seed = seed_snapshot(config.seed_records);
    let mut agent = AgentRun::shadow(keel_config.clone(), seed.clone())?
        .with_client(&format!("sim-{run}"));

    let mut stats = SimulatorStats {
        runs: 1,
        ..SimulatorStats::default()
    };
    let mut violations = Vec::new();
    let mut completed: Vec<TransactionId> = Vec::new();

    for step in 0..config.steps_per_run {
        let operation = generate_operation(&mut rng, config.seed_records, completed.len());
        let before = violations.len();

        apply_operation(
            &agent,
            run,
            step,
            &operation,
            &mut completed,
            &mut stats,
            &mut violations,
        );

        if let SimulatedOperation::Create { kind, id }
        | SimulatedOperation::Update { kind, id, .. } = &operation
        {
            agent
                .context_mut()
                .add_content(kind, format!("step {step}: wrote {kind}/{id}"), 1.0);
        }
        if agent.maybe_compress() {
            stats.compressions += 1;
            let tokens = agent.context().total_tokens();
            let target = agent.config().context.target_tokens();
            if tokens > target {
                violations.push(Violation::ContextOverBudget { run, tokens, target });
            }
        }

        if config.stop_on_first_violation && violations.len() > before {
            break;
        }
    }

    stats.logged_writes = agent.store().log().len() as u64;
    agent.reset();
    if agent.store().snapshot() != seed || !agent.store().log().is_empty() {
        violations.push(Violation::ResetLeak { run });
    }

    tracing::debug!(run, violations = violations.len(), "Simulated run finished");
    Ok(RunOutcome { stats, violations })
}

fn generate_operation(
    rng: &mut StdRng,
    seed_records: usize,
    completed: usize,
) -> SimulatedOperation {
    let kind = KINDS[rng.gen_range(0..KINDS.len())].to_string();
    // Ids range past the seed so creates, updates and deletes also hit missing records
    let id = format!("{kind}-{}", rng.gen_range(0..(seed_records * 2).max(1)));

    let roll = rng.gen_range(0..100);
    match roll {
        0..=19 => SimulatedOperation::Create { kind, id },
        20..=49 => SimulatedOperation::Update {
            kind,
            id,
            revision: rng.gen(),
        },
        50..=64 => SimulatedOperation::Delete { kind, id },
        65..=74 => SimulatedOperation::FailingWrite { kind, id },
        75..=84 if completed > 0 => SimulatedOperation::Rollback {
            index: rng.gen_range(0..completed),
        },
        85..=99 if completed > 0 => SimulatedOperation::Restore {
            index: rng.gen_range(0..completed),
        },
        _ => SimulatedOperation::Update {
            kind,
            id,
            revision: rng.gen(),
        },
    }
}

fn apply_operation(
    agent: &AgentRun<ShadowStore>,
    run: usize,
    step: usize,
    operation: &SimulatedOperation,
    completed: &mut Vec<TransactionId>,
    stats: &mut SimulatorStats,
    violations: &mut Vec<Violation>,
) {
    let store = agent.store().as_ref();
    let executor = agent.executor();

    let outcome = match operation {
        SimulatedOperation::Create { kind, id } => {
            let (kind, id) = (ResourceKind::new(kind.as_str()), ResourceId::new(id.as_str()));
            let mut fields = Record::new();
            fields.insert("title".into(), json!(format!("Created at step {step}")));
            let target = ActionTarget::new(ActionKind::Create, kind.clone(), id.clone());
            executor.execute_on(store, target, |s| s.create(&kind, &id, fields).map(|_| ()))
        }
        SimulatedOperation::Update { kind, id, revision } => {
            let (kind, id) = (ResourceKind::new(kind.as_str()), ResourceId::new(id.as_str()));
            let mut fields = Record::new();
            fields.insert("revision".into(), json!(revision));
            let target = ActionTarget::new(ActionKind::Update, kind.clone(), id.clone());
            executor.execute_on(store, target, |s| s.update(&kind, &id, fields).map(|_| ()))
        }
        SimulatedOperation::Delete { kind, id } => {
            let (kind, id) = (ResourceKind::new(kind.as_str()), ResourceId::new(id.as_str()));
            let target = ActionTarget::new(ActionKind::Delete, kind.clone(), id.clone());
            executor.execute_on(store, target, |s| s.delete(&kind, &id).map(|_| ()))
        }
        SimulatedOperation::FailingWrite { kind, id } => {
            let ledger_len = agent.ledger().len();
            let log_len = store.log().len();
            stats.actions_attempted += 1;

            let outcome = executor.execute_on(
                store,
                ActionTarget::new(ActionKind::Update, kind.as_str(), id.as_str()),
                |_| Err::<(), _>(StoreError::Backend("injected failure".into())),
            );

            stats.actions_failed += 1;
            let recorded = agent.ledger().len() != ledger_len;
            let written = store.log().len() != log_len;
            if outcome.is_completed() || recorded || written {
                violations.push(Violation::FailedActionRecorded { run, step });
            }
            return;
        }
        SimulatedOperation::Rollback { index } => {
            check_rollback(agent, run, completed[*index], stats, violations);
            return;
        }
        SimulatedOperation::Restore { index } => {
            check_restore(agent, run, completed[*index], stats, violations);
            return;
        }
    };

    stats.actions_attempted += 1;
    match outcome.transaction_id() {
        Some(id) => {
            stats.actions_completed += 1;
            completed.push(id);
        }
        None => violations.push(Violation::UnexpectedOutcome {
            run,
            operation: operation.clone(),
            error: outcome.error().unwrap_or_default().to_string(),
        }),
    }
}

fn check_rollback(
    agent: &AgentRun<ShadowStore>,
    run: usize,
    id: TransactionId,
    stats: &mut SimulatorStats,
    violations: &mut Vec<Violation>,
) {
    let expected = agent
        .ledger()
        .get(&id)
        .and_then(|tx| tx.previous_state().cloned());

    match agent.executor().rollback(&id) {
        Ok(receipt) => {
            stats.rollbacks += 1;
            if receipt.previous_state != expected {
                violations.push(Violation::RollbackMismatch {
                    run,
                    transaction_id: id.to_string(),
                });
            }
            if agent.executor().rollback(&id).is_ok() {
                violations.push(Violation::DoubleRollbackAccepted {
                    run,
                    transaction_id: id.to_string(),
                });
            }
        }
        Err(LedgerError::AlreadyRolledBack(_)) => stats.rejected_rollbacks += 1,
        Err(e) => violations.push(Violation::UnexpectedOutcome {
            run,
            operation: SimulatedOperation::Rollback { index: 0 },
            error: e.to_string(),
        }),
    }
}

fn check_restore(
    agent: &AgentRun<ShadowStore>,
    run: usize,
    id: TransactionId,
    stats: &mut SimulatorStats,
    violations: &mut Vec<Violation>,
) {
    let Some(tx) = agent.ledger().get(&id) else {
        return;
    };
    let store = agent.store().as_ref();

    match agent.executor().rollback_and_restore(&id, store) {
        Ok(_) => {
            stats.restores += 1;
            let current = store
                .current(tx.resource_kind(), tx.resource_id())
                .ok()
                .flatten();
            if current.as_ref() != tx.previous_state() {
                violations.push(Violation::RestoreMismatch {
                    run,
                    transaction_id: id.to_string(),
                });
            }
        }
        Err(RestoreError::Ledger(LedgerError::AlreadyRolledBack(_))) => {
            stats.rejected_rollbacks += 1;
        }
        Err(e) => violations.push(Violation::UnexpectedOutcome {
            run,
            operation: SimulatedOperation::Restore { index: 0 },
            error: e.to_string(),
        }),
    }
}
