//! Token budget allocation across segments

use indexmap::IndexMap;

/// Split `max_tokens` across `segments`
///
/// With `n` segments the base share is `max_tokens / (n + 1)`. When `focus`
/// names one of the segments it receives `floor(base * focus_multiplier)`,
/// capped at `max_tokens`, and every other segment gets
/// `(max_tokens - focus_share) / n`. Without a matching focus every segment
/// gets the base share. The shares never sum past `max_tokens`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn allocate<'a, I>(
    max_tokens: usize,
    segments: I,
    focus: Option<&str>,
    focus_multiplier: f64,
) -> IndexMap<String, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&str> = segments.into_iter().collect();
    let n = names.len();
    if n == 0 {
        return IndexMap::new();
    }

    let base = max_tokens / (n + 1);
    let focus = focus.filter(|f| names.contains(f));

    let Some(focus) = focus else {
        return names.into_iter().map(|name| (name.to_string(), base)).collect();
    };

    let boosted = ((base as f64) * focus_multiplier).floor().max(0.0) as usize;
    let focus_share = boosted.min(max_tokens);
    let other_share = max_tokens.saturating_sub(focus_share) / n;

    names
        .into_iter()
        .map(|name| {
            let share = if name == focus { focus_share } else { other_share };
            (name.to_string(), share)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn focus_gets_boosted_share() {
        let names = ["regulatory", "clinical", "technical"];
        let budgets = allocate(2000, names, Some("regulatory"), 1.5);
        assert_eq!(budgets["regulatory"], 750);
        assert_eq!(budgets["clinical"], 416);
        assert_eq!(budgets["technical"], 416);
    }

    #[test]
    fn no_focus_splits_evenly() {
        let budgets = allocate(2000, ["a", "b", "c"], None, 1.5);
        let shares: Vec<usize> = budgets.values().copied().collect();
        assert_eq!(shares, vec![500, 500, 500]);
    }

    #[test]
    fn unknown_focus_is_ignored() {
        let budgets = allocate(900, ["a", "b"], Some("missing"), 1.5);
        assert_eq!(budgets["a"], 300);
        assert_eq!(budgets["b"], 300);
    }

    #[test]
    fn focus_share_capped_at_request() {
        let budgets = allocate(1000, ["a"], Some("a"), 3.0);
        assert_eq!(budgets["a"], 1000);

        let budgets = allocate(1000, ["a", "b"], Some("a"), 4.0);
        assert_eq!(budgets["a"], 1000);
        assert_eq!(budgets["b"], 0);
    }

    #[test]
    fn no_segments_no_budgets() {
        assert!(allocate(1000, std::iter::empty(), Some("a"), 1.5).is_empty());
    }
}
