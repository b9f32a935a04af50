//! Keel Context - bounded working memory for long-running agents
//!
//! Content is pushed into named segments as the agent works. Before a step
//! that consumes accumulated knowledge, [`ContextStore::bounded_context`]
//! renders a token-budgeted view across segments, optionally favouring a
//! focus segment. When the total crosses the configured threshold,
//! [`ContextStore::compress`] prunes every segment to an equal share of the
//! compression target.
//!
//! # Example
//!
//! ```rust
//! use keel_context::{ContextConfig, ContextStore, DEFAULT_RELEVANCE};
//!
//! let mut context = ContextStore::new(ContextConfig::default());
//! context.add_content("research", "Predicate device K123456", DEFAULT_RELEVANCE);
//! context.add_content("draft", "Section 1: Device description", DEFAULT_RELEVANCE);
//!
//! let view = context.bounded_context(2000, Some("draft"));
//! assert!(view.starts_with("## RESEARCH\n"));
//! assert!(!context.should_compress(context.total_tokens()));
//! ```

pub mod budget;
pub mod config;
pub mod error;
pub mod item;
pub mod scoring;
pub mod segment;
pub mod store;
pub mod tokenizer;

pub use budget::allocate;
pub use config::ContextConfig;
pub use error::{ContextError, ContextResult};
pub use item::ContextItem;
pub use scoring::{PreservedScorer, RecencyScorer, RelevanceScorer};
pub use segment::Segment;
pub use store::{ContextState, ContextStore, DEFAULT_RELEVANCE};
pub use tokenizer::{RegexTokenizer, Tokenizer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
