//! Named segments of working memory

use crate::item::ContextItem;
use crate::scoring::RelevanceScorer;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};

/// Ordered items under one name, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    items: Vec<ContextItem>,
    next_rank: u64,
}

impl Segment {
    /// Create empty segment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a segment from items in chronological order
    #[must_use]
    pub fn from_items(items: Vec<ContextItem>) -> Self {
        let next_rank = items.iter().map(|i| i.inserted_at + 1).max().unwrap_or(0);
        Self { items, next_rank }
    }

    /// Replace items, keeping the rank counter so later additions stay newest
    pub fn replace_items(&mut self, items: Vec<ContextItem>) {
        let floor = items.iter().map(|i| i.inserted_at + 1).max().unwrap_or(0);
        self.next_rank = self.next_rank.max(floor);
        self.items = items;
    }

    /// Append text with the given relevance
    pub fn add(&mut self, content: impl Into<String>, relevance: f64) -> &ContextItem {
        let rank = self.next_rank;
        self.next_rank += 1;
        self.items.push(ContextItem::new(content, relevance, rank));
        &self.items[self.items.len() - 1]
    }

    /// Items in chronological order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the segment holds no items
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total tokens across all items
    #[must_use]
    pub fn tokens(&self, tokenizer: &dyn Tokenizer) -> usize {
        self.items.iter().map(|i| tokenizer.count(&i.content)).sum()
    }

    /// Reassign every item's relevance with `scorer`
    pub fn rescore(&mut self, scorer: &dyn RelevanceScorer) {
        let count = self.items.len();
        let scores: Vec<f64> = self
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| scorer.score(position, count, item))
            .collect();
        for (item, score) in self.items.iter_mut().zip(scores) {
            item.relevance = score;
        }
    }

    /// Items that fit `budget` tokens, most relevant first
    ///
    /// Items are taken in descending relevance (ties keep insertion order)
    /// while they fit. The first item that does not fit is cut to the
    /// remaining tokens, if any, and selection stops there.
    #[must_use]
    pub fn compressed(&self, budget: usize, tokenizer: &dyn Tokenizer) -> Vec<ContextItem> {
        let mut ranked: Vec<&ContextItem> = self.items.iter().collect();
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));

        let mut used = 0;
        let mut kept = Vec::new();
        for item in ranked {
            if used >= budget {
                break;
            }
            let tokens = tokenizer.count(&item.content);
            if used + tokens <= budget {
                kept.push(item.clone());
                used += tokens;
                continue;
            }
            let remaining = budget - used;
            kept.push(item.truncated_to(tokenizer.truncate(&item.content, remaining)));
            break;
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RecencyScorer;
    use crate::tokenizer::RegexTokenizer;
    use keel_test_utils::words;
    use pretty_assertions::assert_eq;

    #[test]
    fn ranks_are_monotonic() {
        let mut segment = Segment::new();
        segment.add("a", 1.0);
        segment.add("b", 1.0);
        let ranks: Vec<u64> = segment.items().iter().map(|i| i.inserted_at).collect();
        assert_eq!(ranks, vec![0, 1]);

        let mut rebuilt = Segment::from_items(vec![segment.items()[1].clone()]);
        assert_eq!(rebuilt.add("c", 1.0).inserted_at, 2);
    }

    #[test]
    fn recency_compression_keeps_newest_and_truncates_next() {
        let tokenizer = RegexTokenizer::new();
        let mut segment = Segment::new();
        for i in 0..4 {
            segment.add(words(&format!("m{i}w"), 50), 1.0);
        }
        segment.rescore(&RecencyScorer);

        let kept = segment.compressed(90, &tokenizer);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].inserted_at, 3);
        assert!(!kept[0].truncated);
        assert_eq!(tokenizer.count(&kept[0].content), 50);
        assert_eq!(kept[1].inserted_at, 2);
        assert!(kept[1].truncated);
        assert_eq!(tokenizer.count(&kept[1].content), 40);
        assert!(kept[0].relevance > kept[1].relevance);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let tokenizer = RegexTokenizer::new();
        let mut segment = Segment::new();
        segment.add("first", 0.7);
        segment.add("second", 0.7);
        segment.add("top", 0.9);

        let contents: Vec<String> = segment
            .compressed(10, &tokenizer)
            .into_iter()
            .map(|i| i.content)
            .collect();
        assert_eq!(contents, vec!["top", "first", "second"]);
    }

    #[test]
    fn exhausted_budget_drops_rest() {
        let tokenizer = RegexTokenizer::new();
        let mut segment = Segment::new();
        segment.add("one two", 0.9);
        segment.add("three", 0.5);

        let kept = segment.compressed(2, &tokenizer);
        assert_eq!(kept.len(), 1);
        assert!(!kept[0].truncated);
    }

    #[test]
    fn zero_budget_keeps_nothing() {
        let mut segment = Segment::new();
        segment.add("anything", 1.0);
        assert!(segment.compressed(0, &RegexTokenizer::new()).is_empty());
    }
}
