//! Subsequence scoring for quick-open and command filtering.
//!
//! A query matches a target when its characters appear in the target in the
//! same order, case-insensitively. Each matched character is worth the number
//! of characters from its position to the end of the target, so matches near
//! the start of a label outrank matches near the end.

use std::ops::Range;

/// Score `target` against `query`. Returns 0 when the query is not a
/// subsequence of the target. An empty query always scores 0; callers treat
/// it as "show everything, unranked".
pub fn score(query: &str, target: &str) -> u32 {
    let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if query.is_empty() {
        return 0;
    }

    let target = fold(target);
    let len = target.len() as u32;
    let mut total = 0u32;
    let mut next = 0usize;

    for (index, (_, ch)) in target.iter().enumerate() {
        if next == query.len() {
            break;
        }
        if *ch == query[next] {
            total = total.saturating_add(len - index as u32);
            next += 1;
        }
    }

    if next == query.len() {
        total
    } else {
        0
    }
}

/// Lowercase `text` one character at a time, tagging every folded character
/// with the byte range of the character it came from. A character such as
/// 'İ' folds to more than one character; all of them share its range.
fn fold(text: &str) -> Vec<(Range<usize>, char)> {
    text.char_indices()
        .flat_map(|(offset, ch)| {
            let range = offset..offset + ch.len_utf8();
            ch.to_lowercase().map(move |folded| (range.clone(), folded))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked<T> {
    pub item: T,
    pub score: u32,
}

/// Keep the candidates that match and order them by descending score.
/// The sort is stable, so equal scores keep their input order.
pub fn rank<T, F>(query: &str, candidates: impl IntoIterator<Item = T>, label: F) -> Vec<Ranked<T>>
where
    F: Fn(&T) -> &str,
{
    let mut ranked: Vec<Ranked<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let score = score(query, label(&item));
            (score > 0).then_some(Ranked { item, score })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Byte ranges of the characters a greedy left-to-right walk pairs with the
/// query, for rendering match highlights.
pub fn highlight(text: &str, query: &str) -> Vec<Range<usize>> {
    let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut next = 0usize;

    for (range, ch) in fold(text) {
        if next == query.len() {
            break;
        }
        if ch == query[next] {
            if ranges.last() != Some(&range) {
                ranges.push(range);
            }
            next += 1;
        }
    }

    if next == query.len() {
        ranges
    } else {
        Vec::new()
    }
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_rejects_non_subsequence() {
        assert_eq!(score("xyz", "notes.md"), 0);
        assert_eq!(score("sn", "notes"), 0);
    }

    #[test]
    fn test_score_accepts_subsequence_case_insensitively() {
        assert!(score("NTS", "notes.md") > 0);
        assert!(score("nmd", "Notes.MD") > 0);
    }

    #[test]
    fn test_score_weights_by_distance_from_end() {
        // "ab": a at 0 (+3), b at 1 (+2)
        assert_eq!(score("ab", "abc"), 5);
        // "ab": a at 1 (+2), b at 2 (+1)
        assert_eq!(score("ab", "xab"), 3);
    }

    #[test]
    fn test_earlier_match_never_scores_lower() {
        let target_late = "xxxxa";
        let target_early = "axxxx";
        assert!(score("a", target_early) >= score("a", target_late));

        let words = ["save file", "file save", "toggle sidebar", "sidebar"];
        for word in words {
            for (i, ch) in word.char_indices().skip(1) {
                let mut moved = String::new();
                moved.push(ch);
                moved.push_str(&word[..i]);
                moved.push_str(&word[i + ch.len_utf8()..]);
                let q = ch.to_string();
                assert!(score(&q, &moved) >= score(&q, word), "{} vs {}", moved, word);
            }
        }
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(score("", "anything"), 0);
        assert_eq!(score("", ""), 0);
    }

    #[test]
    fn test_score_is_deterministic() {
        assert_eq!(score("tog", "Toggle Sidebar"), score("tog", "Toggle Sidebar"));
    }

    #[test]
    fn test_rank_is_stable_for_equal_scores() {
        let ranked = rank("a", vec!["xa", "ya", "za"], |label| *label);
        let order: Vec<&str> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(order, vec!["xa", "ya", "za"]);
        assert!(ranked.iter().all(|r| r.score == 1));
    }

    #[test]
    fn test_rank_orders_mixed_scores_then_input_order() {
        // "ab" scores 2, "ba" and "xa" tie at 1, "bb" does not match.
        let ranked = rank("a", vec!["ba", "bb", "ab", "xa"], |label| *label);
        let order: Vec<(&str, u32)> = ranked.iter().map(|r| (r.item, r.score)).collect();
        assert_eq!(order, vec![("ab", 2), ("ba", 1), ("xa", 1)]);
    }

    #[test]
    fn test_rank_drops_non_matches() {
        let ranked = rank("zz", vec!["notes", "draft"], |label| *label);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_highlight_marks_greedy_matches() {
        assert_eq!(highlight("Notes.md", "nmd"), vec![0..1, 6..7, 7..8]);
        assert!(highlight("Notes.md", "").is_empty());
    }

    #[test]
    fn test_highlight_agrees_with_score_on_multi_char_folds() {
        // 'İ' lowercases to "i\u{307}", two characters.
        let text = "İstanbul";
        for query in ["i", "is", "i\u{307}s", "stan"] {
            assert!(score(query, text) > 0, "{}", query);
            assert!(!highlight(text, query).is_empty(), "{}", query);
        }
        assert_eq!(highlight(text, "is"), vec![0..2, 2..3]);
        assert_eq!(highlight(text, "i\u{307}s"), vec![0..2, 2..3]);
    }

    #[test]
    fn test_highlight_is_empty_when_query_does_not_match() {
        assert_eq!(score("zq", "Notes.md"), 0);
        assert!(highlight("Notes.md", "zq").is_empty());
    }
}
