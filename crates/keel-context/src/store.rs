//! Segmented context store
//!
//! Holds named segments of working memory and produces token-bounded views
//! over them. When the accumulated volume crosses the configured threshold
//! the caller runs a compression pass, which rescores every segment and
//! keeps only what fits the compression target.

use crate::budget;
use crate::config::ContextConfig;
use crate::item::ContextItem;
use crate::scoring::{RecencyScorer, RelevanceScorer};
use crate::segment::Segment;
use crate::tokenizer::{RegexTokenizer, Tokenizer};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Relevance used when the caller has no opinion
pub const DEFAULT_RELEVANCE: f64 = 1.0;

const SEGMENT_SEPARATOR: &str = "\n\n---\n\n";
const ITEM_SEPARATOR: &str = "\n\n";

/// Deep copy of every segment, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextState {
    segments: IndexMap<String, Segment>,
}

impl ContextState {
    /// Create empty state
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment, replacing any with the same name
    #[must_use]
    pub fn with_segment(mut self, name: impl Into<String>, segment: Segment) -> Self {
        self.segments.insert(name.into(), segment);
        self
    }

    /// Segment by name
    #[inline]
    #[must_use]
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Segments in creation order
    pub fn segments(&self) -> impl Iterator<Item = (&str, &Segment)> {
        self.segments.iter().map(|(name, segment)| (name.as_str(), segment))
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Named segments with bounded retrieval and compression
#[derive(Debug, Clone)]
pub struct ContextStore {
    config: ContextConfig,
    tokenizer: Arc<dyn Tokenizer>,
    scorer: Arc<dyn RelevanceScorer>,
    segments: IndexMap<String, Segment>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl ContextStore {
    /// Create store with the regex tokenizer and recency scoring
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            tokenizer: Arc::new(RegexTokenizer::new()),
            scorer: Arc::new(RecencyScorer),
            segments: IndexMap::new(),
        }
    }

    /// Use a different tokenizer
    #[inline]
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Use a different scorer for compression
    #[inline]
    #[must_use]
    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Tokenizer every budget is counted in
    #[inline]
    #[must_use]
    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Scorer used by compression
    #[inline]
    #[must_use]
    pub fn scorer(&self) -> &Arc<dyn RelevanceScorer> {
        &self.scorer
    }

    /// Drop every segment, keeping configuration, tokenizer and scorer
    pub fn clear(&mut self) {
        tracing::debug!(segments = self.segments.len(), "Context cleared");
        self.segments.clear();
    }

    /// Append `text` to `segment`, creating the segment on first write
    pub fn add_content(&mut self, segment: &str, text: impl Into<String>, relevance: f64) {
        let item = self
            .segments
            .entry(segment.to_string())
            .or_default()
            .add(text, relevance);
        tracing::debug!(segment, rank = item.inserted_at, relevance, "Context added");
    }

    /// Segment by name
    #[inline]
    #[must_use]
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Segment names in creation order
    pub fn segment_names(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(String::as_str)
    }

    /// Tokens in `text`
    #[inline]
    #[must_use]
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    /// Tokens held across every segment
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.segments
            .values()
            .map(|s| s.tokens(self.tokenizer.as_ref()))
            .sum()
    }

    /// Tokens held across every segment of `state`
    #[must_use]
    pub fn state_tokens(&self, state: &ContextState) -> usize {
        state
            .segments
            .values()
            .map(|s| s.tokens(self.tokenizer.as_ref()))
            .sum()
    }

    /// Whether `current_tokens` has reached the compression threshold
    #[inline]
    #[must_use]
    pub fn should_compress(&self, current_tokens: usize) -> bool {
        current_tokens >= self.config.threshold_tokens()
    }

    /// Token-bounded view over all segments
    ///
    /// Each segment is compressed to its allocated budget and rendered as a
    /// `## NAME` heading followed by its items. Segments with nothing left
    /// are skipped. Headings and separators are not counted against the
    /// budget.
    #[must_use]
    pub fn bounded_context(&self, max_tokens: usize, focus: Option<&str>) -> String {
        let budgets = budget::allocate(
            max_tokens,
            self.segment_names(),
            focus,
            self.config.focus_multiplier,
        );

        let mut sections = Vec::new();
        for (name, segment) in &self.segments {
            let allowed = budgets.get(name).copied().unwrap_or(0);
            let items = segment.compressed(allowed, self.tokenizer.as_ref());
            let body = items
                .iter()
                .map(|item| item.content.as_str())
                .filter(|content| !content.is_empty())
                .collect::<Vec<_>>()
                .join(ITEM_SEPARATOR);
            if body.is_empty() {
                continue;
            }
            sections.push(format!("## {}\n{body}", name.to_uppercase()));
        }

        sections.join(SEGMENT_SEPARATOR)
    }

    /// Deep copy of the current segments
    #[must_use]
    pub fn checkpoint(&self) -> ContextState {
        ContextState {
            segments: self.segments.clone(),
        }
    }

    /// Replace all segments with `state`
    pub fn restore(&mut self, state: ContextState) {
        tracing::debug!(segments = state.len(), "Context restored from checkpoint");
        self.segments = state.segments;
    }

    /// Compress `state` if it has reached the threshold
    ///
    /// Below the threshold `state` comes back unchanged. Otherwise every
    /// segment is rescored with the configured scorer and cut to an equal
    /// share of the compression target. Kept items stay in chronological
    /// order and keep their relevance.
    #[must_use]
    pub fn compress(&self, state: ContextState) -> ContextState {
        let before = self.state_tokens(&state);
        if state.is_empty() || !self.should_compress(before) {
            return state;
        }

        let per_segment = self.config.target_tokens() / state.len();
        let segments: IndexMap<String, Segment> = state
            .segments
            .into_iter()
            .map(|(name, mut segment)| {
                segment.rescore(self.scorer.as_ref());
                let mut kept: Vec<ContextItem> =
                    segment.compressed(per_segment, self.tokenizer.as_ref());
                kept.sort_by_key(|item| item.inserted_at);
                segment.replace_items(kept);
                (name, segment)
            })
            .collect();

        let compressed = ContextState { segments };
        tracing::info!(
            before,
            after = self.state_tokens(&compressed),
            per_segment,
            scorer = self.scorer.name(),
            "Context compressed"
        );
        compressed
    }

    /// Compress the store's own segments if due; returns whether it did
    pub fn compress_in_place(&mut self) -> bool {
        if !self.should_compress(self.total_tokens()) {
            return false;
        }
        let compressed = self.compress(self.checkpoint());
        self.segments = compressed.segments;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::PreservedScorer;
    use keel_test_utils::words;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_store_renders_nothing() {
        let store = ContextStore::default();
        assert_eq!(store.bounded_context(0, None), "");
        assert_eq!(store.bounded_context(10_000, Some("research")), "");
    }

    #[test]
    fn renders_headings_and_separators() {
        let mut store = ContextStore::default();
        store.add_content("research", "predicate K123", DEFAULT_RELEVANCE);
        store.add_content("research", "no recalls", 0.5);
        store.add_content("draft", "Section 1", DEFAULT_RELEVANCE);

        assert_eq!(
            store.bounded_context(1000, None),
            "## RESEARCH\npredicate K123\n\nno recalls\n\n---\n\n## DRAFT\nSection 1"
        );
    }

    #[test]
    fn bounded_view_prefers_relevant_items() {
        let mut store = ContextStore::default();
        store.add_content("notes", words("low", 10), 0.1);
        store.add_content("notes", words("high", 10), 0.9);

        // one segment: budget is 30 / 2 = 15
        let view = store.bounded_context(30, None);
        assert!(view.starts_with("## NOTES\nhigh0"));
        assert!(view.ends_with("low4"));
    }

    #[test]
    fn segments_with_no_budget_are_skipped() {
        let mut store = ContextStore::default();
        store.add_content("a", "alpha", DEFAULT_RELEVANCE);
        store.add_content("b", "beta", DEFAULT_RELEVANCE);
        assert_eq!(store.bounded_context(2, None), "");
    }

    #[test]
    fn compression_trigger_boundary() {
        let store = ContextStore::default();
        assert!(!store.should_compress(4799));
        assert!(store.should_compress(4800));
    }

    #[test]
    fn compress_below_threshold_is_identity() {
        let mut store = ContextStore::default();
        store.add_content("research", words("w", 100), 0.3);
        let state = store.checkpoint();

        assert_eq!(store.compress(state.clone()), state);
    }

    #[test]
    fn compress_keeps_newest_within_target() {
        let config = ContextConfig::default().with_window_limit(180);
        let mut store = ContextStore::new(config);
        for i in 0..4 {
            store.add_content("research", words(&format!("r{i}w"), 50), 0.2);
        }
        assert_eq!(store.total_tokens(), 200);

        let compressed = store.compress(store.checkpoint());
        let items = compressed.segment("research").unwrap().items();

        let ranks: Vec<u64> = items.iter().map(|i| i.inserted_at).collect();
        assert_eq!(ranks, vec![2, 3]);
        assert!(items[0].truncated);
        assert_eq!(store.count_tokens(&items[0].content), 40);
        assert_eq!(store.count_tokens(&items[1].content), 50);
        assert_eq!(store.state_tokens(&compressed), 90);
    }

    #[test]
    fn clear_keeps_scorer_and_config() {
        let config = ContextConfig::default().with_window_limit(100);
        let mut store = ContextStore::new(config).with_scorer(Arc::new(PreservedScorer));
        store.add_content("notes", "first note", 0.9);

        store.clear();

        assert_eq!(store.total_tokens(), 0);
        assert!(store.segment("notes").is_none());
        assert_eq!(store.scorer().name(), "preserved");
        assert_eq!(store.config().window_limit, 100);
    }

    #[test]
    fn preserved_scorer_keeps_caller_relevance() {
        let config = ContextConfig::default().with_window_limit(100);
        let mut store = ContextStore::new(config).with_scorer(Arc::new(PreservedScorer));
        store.add_content("notes", words("keep", 50), 0.9);
        store.add_content("notes", words("drop", 40), 0.1);

        assert!(store.compress_in_place());
        let items = store.segment("notes").unwrap().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].relevance, 0.9);
        assert!(items[0].content.starts_with("keep0"));
    }

    #[test]
    fn additions_after_compression_rank_newest() {
        let config = ContextConfig::default().with_window_limit(100);
        let mut store = ContextStore::new(config).with_scorer(Arc::new(PreservedScorer));
        store.add_content("notes", words("old", 50), 0.9);
        store.add_content("notes", words("new", 40), 0.1);
        assert!(store.compress_in_place());

        store.add_content("notes", "latest", 0.5);
        let ranks: Vec<u64> = store
            .segment("notes")
            .unwrap()
            .items()
            .iter()
            .map(|i| i.inserted_at)
            .collect();
        assert_eq!(ranks, vec![0, 2]);
    }

    #[test]
    fn checkpoint_restore_round_trip() {
        let mut store = ContextStore::default();
        store.add_content("draft", "v1", DEFAULT_RELEVANCE);
        let checkpoint = store.checkpoint();

        store.add_content("draft", "v2", DEFAULT_RELEVANCE);
        store.add_content("review", "looks fine", DEFAULT_RELEVANCE);
        store.restore(checkpoint.clone());

        assert_eq!(store.checkpoint(), checkpoint);
        assert_eq!(store.segment_names().collect::<Vec<_>>(), vec!["draft"]);
    }

    #[test]
    fn compress_in_place_skips_below_threshold() {
        let mut store = ContextStore::default();
        store.add_content("notes", "short", DEFAULT_RELEVANCE);
        assert!(!store.compress_in_place());
        assert_eq!(store.segment("notes").unwrap().len(), 1);
    }
}
