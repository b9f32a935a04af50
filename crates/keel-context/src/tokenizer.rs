//! Token counting and truncation
//!
//! Budgets everywhere in this crate are expressed in tokenizer units. The
//! tokenizer is fixed per [`ContextStore`](crate::ContextStore) so counts
//! are comparable across segments and calls.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Debug;
use std::ops::Range;

/// Splits text into contiguous tokens
pub trait Tokenizer: Debug + Send + Sync {
    /// Byte ranges of each token, in order
    ///
    /// Consecutive spans must be contiguous so that any prefix of tokens
    /// maps to a prefix of the text.
    fn spans(&self, text: &str) -> Vec<Range<usize>>;

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize {
        self.spans(text).len()
    }

    /// Leading `max_tokens` tokens of `text`
    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if max_tokens == 0 {
            return "";
        }
        match self.spans(text).get(max_tokens - 1) {
            Some(span) => &text[..span.end],
            None => text,
        }
    }
}

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*(?:\w+|[^\w\s])").expect("token pattern is a valid regex")
});

/// Word/symbol tokenizer
///
/// A token is a run of word characters or a single other non-space
/// character, together with the whitespace before it. Trailing whitespace
/// is not a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTokenizer;

impl RegexTokenizer {
    /// Create tokenizer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for RegexTokenizer {
    fn spans(&self, text: &str) -> Vec<Range<usize>> {
        TOKEN_PATTERN.find_iter(text).map(|m| m.range()).collect()
    }
}
