//! Keel Core - transactional state and bounded memory for agent runs
//!
//! Ties the workspace together:
//! - [`AgentRun`]: one store, ledger, executor, context store and tool set
//!   per run
//! - [`tools::DocumentTools`]: rollback-tracked document and form operations
//! - [`KeelConfig`]: TOML configuration
//! - [`simulator`]: seeded randomized checks of rollback, restore and reset
//! - [`telemetry`]: tracing subscriber setup for binaries
//!
//! # Example
//!
//! ```rust
//! use keel_core::prelude::*;
//! use keel_store::StoreSnapshot;
//!
//! let run = AgentRun::shadow(KeelConfig::default(), StoreSnapshot::new()).unwrap();
//! let created = run
//!     .tools()
//!     .create_document(NewDocument::new("regulatory", "Device description", "Draft"))
//!     .unwrap();
//!
//! run.tools().undo_transaction(&created.transaction_id).unwrap();
//! assert!(run.tools().list_documents().is_empty());
//! ```

pub mod config;
pub mod error;
pub mod run;
pub mod simulator;
pub mod telemetry;
pub mod tools;

pub use config::{ConfigError, KeelConfig, StoreConfig};
pub use error::{KeelError, KeelResult};
pub use run::AgentRun;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{KeelConfig, StoreConfig};
    pub use crate::error::{KeelError, KeelResult};
    pub use crate::run::AgentRun;
    pub use crate::tools::{DocumentTools, DocumentUpdate, NewDocument, ToolReceipt};
    pub use keel_context::{ContextConfig, ContextStore};
    pub use keel_ledger::{ActionExecutor, TransactionId, TransactionLedger};
    pub use keel_store::{ResourceStore, ShadowStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
