//! Context items

use serde::{Deserialize, Serialize};

/// A piece of text held in a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Text body
    pub content: String,
    /// Relevance weight; higher is more important
    pub relevance: f64,
    /// Insertion rank within the segment, oldest first
    pub inserted_at: u64,
    /// Whether `content` was cut to fit a budget
    #[serde(default)]
    pub truncated: bool,
}

impl ContextItem {
    /// Create item
    #[inline]
    #[must_use]
    pub fn new(content: impl Into<String>, relevance: f64, inserted_at: u64) -> Self {
        Self {
            content: content.into(),
            relevance,
            inserted_at,
            truncated: false,
        }
    }

    /// Copy of this item with `content` replaced by a truncated prefix
    #[must_use]
    pub fn truncated_to(&self, content: &str) -> Self {
        Self {
            content: content.to_string(),
            relevance: self.relevance,
            inserted_at: self.inserted_at,
            truncated: true,
        }
    }
}
