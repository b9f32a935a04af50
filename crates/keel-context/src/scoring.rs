//! Relevance scoring applied before compression
//!
//! A scorer assigns each item a fresh relevance given its position in the
//! segment's chronological sequence. The default favours recent items;
//! [`PreservedScorer`] keeps whatever the caller supplied.

use crate::item::ContextItem;
use std::fmt::Debug;

/// Assigns relevance to segment items
pub trait RelevanceScorer: Debug + Send + Sync {
    /// Relevance for the item at `position` of `count`, oldest first
    fn score(&self, position: usize, count: usize, item: &ContextItem) -> f64;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Linear recency ramp: `0.5 + position / count * 0.5`
#[derive(Debug, Clone, Copy, Default)]
pub struct RecencyScorer;

impl RelevanceScorer for RecencyScorer {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, position: usize, count: usize, _item: &ContextItem) -> f64 {
        if count == 0 {
            return 0.5;
        }
        0.5 + (position as f64 / count as f64) * 0.5
    }

    fn name(&self) -> &'static str {
        "recency"
    }
}

/// Keeps caller-supplied relevance
#[derive(Debug, Clone, Copy, Default)]
pub struct PreservedScorer;

impl RelevanceScorer for PreservedScorer {
    fn score(&self, _position: usize, _count: usize, item: &ContextItem) -> f64 {
        item.relevance
    }

    fn name(&self) -> &'static str {
        "preserved"
    }
}
