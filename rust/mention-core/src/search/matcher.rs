//! FuzzyMatcher - Subsequence matching with contiguity-weighted scoring
//!
//! A query matches a candidate when its characters appear in the candidate
//! in order. Among all such embeddings the best-scoring one is chosen:
//!
//! ```text
//! bonus = 1 at the first matched char
//! bonus = bonus * 2 + 1 when a match directly follows the previous one
//! bonus = 1 after a gap
//! score = sum of bonus over all matched chars
//! ```
//!
//! So `"ab"` in `"ab"` scores 1 + 3 = 4 while `"ab"` in `"a_b"` scores 2.
//!
//! The search tries every occurrence of each query char, recursing past it.
//! Results are memoized on (candidate index, query index, carried bonus),
//! which returns exactly what the plain backtracking search returns,
//! including the leftmost embedding among equal scores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==================== TYPE DEFINITIONS ====================

/// Options for a single match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchOptions {
    /// Compare chars exactly. Default: false
    pub case_sensitive: bool,
    /// Inserted before every matched char
    pub pre: String,
    /// Inserted after every matched char
    pub post: String,
    /// Bypass matching: every candidate matches with score 0
    pub skip: bool,
    /// Only the part of the query after the last separator is matched
    pub separator: Option<String>,
}

impl MatchOptions {
    pub fn highlighted(pre: impl Into<String>, post: impl Into<String>) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
            ..Self::default()
        }
    }
}

/// Result of matching one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Candidate with each matched char wrapped in pre/post
    pub rendered: String,
    pub score: u64,
}

/// Memoized step: best suffix score from a state and the position chosen
#[derive(Debug, Clone, Copy)]
struct Step {
    score: u64,
    pos: usize,
    bonus: u64,
}

// ==================== MATCHING ====================

/// Match `query` against `candidate`. `None` means no subsequence embedding.
pub fn match_one(query: &str, candidate: &str, opts: &MatchOptions) -> Option<MatchResult> {
    if opts.skip {
        return Some(MatchResult {
            rendered: candidate.to_string(),
            score: 0,
        });
    }

    let query = effective_query(query, opts.separator.as_deref());
    let normalize = |c: char| if opts.case_sensitive { c } else { fold_case(c) };

    let haystack: Vec<char> = candidate.chars().map(normalize).collect();
    let needle: Vec<char> = query.chars().map(normalize).collect();

    let (score, indices) = Embedder::new(&haystack, &needle).best()?;

    Some(MatchResult {
        rendered: render(candidate, &indices, &opts.pre, &opts.post),
        score,
    })
}

/// True when `query` is a subsequence of `candidate` under `opts`
pub fn is_match(query: &str, candidate: &str, opts: &MatchOptions) -> bool {
    match_one(query, candidate, opts).is_some()
}

/// Query actually matched: the segment after the last separator, if any
pub fn effective_query<'q>(query: &'q str, separator: Option<&str>) -> &'q str {
    match separator {
        Some(sep) if !sep.is_empty() => query.rsplit(sep).next().unwrap_or(query),
        _ => query,
    }
}

/// Score an index path. Indices must be strictly increasing.
pub fn score_path(indices: &[usize]) -> u64 {
    let mut score: u64 = 0;
    let mut bonus: u64 = 1;

    for (i, &idx) in indices.iter().enumerate() {
        if i > 0 {
            if indices[i - 1] + 1 == idx {
                bonus = bonus.saturating_mul(2).saturating_add(1);
            } else {
                bonus = 1;
            }
        }
        score = score.saturating_add(bonus);
    }

    score
}

/// Case folding that keeps one char per char so indices stay aligned
fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Wrap the chars at `indices` (char positions) in pre/post
fn render(original: &str, indices: &[usize], pre: &str, post: &str) -> String {
    let mut out = String::with_capacity(original.len() + indices.len() * (pre.len() + post.len()));
    let mut next = indices.iter().peekable();

    for (pos, ch) in original.chars().enumerate() {
        if next.peek() == Some(&&pos) {
            next.next();
            out.push_str(pre);
            out.push(ch);
            out.push_str(post);
        } else {
            out.push(ch);
        }
    }

    out
}

// ==================== SEARCH ====================

/// Best-embedding search over normalized chars
struct Embedder<'a> {
    haystack: &'a [char],
    needle: &'a [char],
    /// (haystack index, needle index, carried bonus) -> best step
    memo: HashMap<(usize, usize, u64), Option<Step>>,
}

impl<'a> Embedder<'a> {
    fn new(haystack: &'a [char], needle: &'a [char]) -> Self {
        Self {
            haystack,
            needle,
            memo: HashMap::new(),
        }
    }

    /// Best (score, index path), or None when the needle does not embed
    fn best(mut self) -> Option<(u64, Vec<usize>)> {
        let score = self.search(0, 0, 0)?;

        let mut indices = Vec::with_capacity(self.needle.len());
        let (mut hay_idx, mut carried) = (0, 0);
        for needle_idx in 0..self.needle.len() {
            let step = self.memo.get(&(hay_idx, needle_idx, carried)).copied().flatten()?;
            indices.push(step.pos);
            hay_idx = step.pos + 1;
            carried = step.bonus;
        }

        Some((score, indices))
    }

    /// Best suffix score from `hay_idx` for `needle[needle_idx..]`.
    ///
    /// `carried` is the bonus of the previous match (0 before the first),
    /// which only extends when the next match lands exactly on `hay_idx`.
    fn search(&mut self, hay_idx: usize, needle_idx: usize, carried: u64) -> Option<u64> {
        if needle_idx == self.needle.len() {
            return Some(0);
        }
        // Remaining query longer than remaining candidate
        if self.needle.len() - needle_idx > self.haystack.len() - hay_idx {
            return None;
        }

        let key = (hay_idx, needle_idx, carried);
        if let Some(cached) = self.memo.get(&key) {
            return cached.map(|step| step.score);
        }

        let wanted = self.needle[needle_idx];
        let mut best: Option<Step> = None;

        for pos in hay_idx..self.haystack.len() {
            if self.haystack[pos] != wanted {
                continue;
            }

            let bonus = if carried > 0 && pos == hay_idx {
                carried.saturating_mul(2).saturating_add(1)
            } else {
                1
            };

            if let Some(rest) = self.search(pos + 1, needle_idx + 1, bonus) {
                let score = rest.saturating_add(bonus);
                // Strictly greater keeps the leftmost embedding on ties
                if best.map_or(true, |b| b.score < score) {
                    best = Some(Step { score, pos, bonus });
                }
            }
        }

        self.memo.insert(key, best);
        best.map(|step| step.score)
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> MatchOptions {
        MatchOptions::default()
    }

    #[test]
    fn test_score_path() {
        assert_eq!(score_path(&[]), 0);
        assert_eq!(score_path(&[4]), 1);
        assert_eq!(score_path(&[0, 1]), 4);
        assert_eq!(score_path(&[0, 2]), 2);
        assert_eq!(score_path(&[0, 1, 2]), 1 + 3 + 7);
        assert_eq!(score_path(&[0, 1, 3, 4]), 1 + 3 + 1 + 3);
    }

    #[test]
    fn test_contiguous_beats_scattered() {
        let contiguous = match_one("ab", "ab", &plain()).unwrap();
        let scattered = match_one("ab", "a_b", &plain()).unwrap();
        assert_eq!(contiguous.score, 4);
        assert_eq!(scattered.score, 2);
    }

    #[test]
    fn test_best_embedding_not_first() {
        // Greedy would take the first "a" and score 2; "ab" at the end scores 4
        let opts = MatchOptions::highlighted("[", "]");
        let result = match_one("ab", "a_xab", &opts).unwrap();
        assert_eq!(result.score, 4);
        assert_eq!(result.rendered, "a_x[a][b]");
    }

    #[test]
    fn test_leftmost_on_equal_scores() {
        let opts = MatchOptions::highlighted("[", "]");
        let result = match_one("a", "banana", &opts).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.rendered, "b[a]nana");
    }

    #[test]
    fn test_no_match() {
        assert!(match_one("xyz", "abc", &plain()).is_none());
        assert!(match_one("ba", "ab", &plain()).is_none());
        assert!(match_one("abcd", "abc", &plain()).is_none());
        assert!(!is_match("q", "", &plain()));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let opts = MatchOptions::highlighted("<b>", "</b>");
        let result = match_one("", "Jordan", &opts).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.rendered, "Jordan");
        assert!(is_match("", "", &plain()));
    }

    #[test]
    fn test_case_sensitivity() {
        let sensitive = MatchOptions {
            case_sensitive: true,
            ..MatchOptions::default()
        };
        assert!(match_one("AB", "ab", &sensitive).is_none());
        assert!(match_one("AB", "ab", &plain()).is_some());
    }

    #[test]
    fn test_render_keeps_original_case() {
        let opts = MatchOptions::highlighted("<span>", "</span>");
        let result = match_one("jh", "Jordan Humphreys", &opts).unwrap();
        assert_eq!(result.rendered, "<span>J</span>ordan <span>H</span>umphreys");
        assert_eq!(result.score, 2);
    }

    #[test]
    fn test_skip() {
        let opts = MatchOptions {
            skip: true,
            pre: "<".into(),
            post: ">".into(),
            ..MatchOptions::default()
        };
        let result = match_one("anything", "literal text", &opts).unwrap();
        assert_eq!(result.rendered, "literal text");
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_separator_splits_query() {
        let opts = MatchOptions {
            separator: Some(",".into()),
            ..MatchOptions::highlighted("[", "]")
        };
        let result = match_one("alice,bo", "bob", &opts).unwrap();
        assert_eq!(result.rendered, "[b][o]b");

        // Trailing separator leaves an empty effective query
        let result = match_one("alice,", "zed", &opts).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.rendered, "zed");
    }

    #[test]
    fn test_effective_query() {
        assert_eq!(effective_query("a b", None), "a b");
        assert_eq!(effective_query("a-b-c", Some("-")), "c");
        assert_eq!(effective_query("abc", Some("-")), "abc");
        assert_eq!(effective_query("abc", Some("")), "abc");
    }

    #[test]
    fn test_unicode_render() {
        let opts = MatchOptions::highlighted("[", "]");
        let result = match_one("tç", "Tributação", &opts).unwrap();
        assert_eq!(result.rendered, "[T]ributa[ç]ão");
    }

    #[test]
    fn test_repeated_chars_are_tractable() {
        let candidate = "a".repeat(80);
        let query = "a".repeat(16);
        let result = match_one(&query, &candidate, &plain()).unwrap();
        // Fully contiguous run of 16: 2^1 - 1 + ... + 2^16 - 1
        let expected: u64 = (1..=16).map(|k| (1u64 << k) - 1).sum();
        assert_eq!(result.score, expected);
    }
}
