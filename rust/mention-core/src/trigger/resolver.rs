//! TriggerResolver - Decides whether a mention is being composed
//!
//! Scans the text preceding the caret for the most recent valid trigger
//! occurrence and extracts the query typed after it.
//!
//! # Features
//! - Multi-character triggers (`$(`), matched only on the full sequence
//! - Per-rule leading-space requirement
//! - Autocomplete mode (empty trigger) with optional separator
//! - Trailing-space detection for committing / closing the menu
//!
//! All occurrences of all triggers are found in one pass with an overlapping
//! Aho-Corasick automaton built once per resolver.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;
use std::collections::HashMap;

use super::rule::{TriggerMatch, TriggerRule};
use crate::error::{MentionError, Result};

/// Trigger resolver over a fixed set of rules
#[derive(Debug, Clone)]
pub struct TriggerResolver {
    rules: Vec<TriggerRule>,
    /// Automaton over all non-empty triggers (None when there are none)
    automaton: Option<AhoCorasick>,
    /// Automaton pattern id -> rule index
    pattern_rules: Vec<usize>,
    /// Trigger sequence -> rule index
    by_trigger: HashMap<String, usize>,
    /// Rule index of the autocomplete rule, if any
    autocomplete: Option<usize>,
    /// Compiled autocomplete separator
    separator: Option<Regex>,
}

impl TriggerResolver {
    /// Build a resolver. Duplicate trigger sequences are rejected.
    pub fn new(rules: Vec<TriggerRule>) -> Result<Self> {
        let mut by_trigger = HashMap::new();
        let mut patterns = Vec::new();
        let mut pattern_rules = Vec::new();
        let mut autocomplete = None;

        for (idx, rule) in rules.iter().enumerate() {
            if by_trigger.insert(rule.trigger.clone(), idx).is_some() {
                return Err(MentionError::DuplicateTrigger(rule.trigger.clone()));
            }
            if rule.is_autocomplete() {
                autocomplete = Some(idx);
            } else {
                patterns.push(rule.trigger.as_str());
                pattern_rules.push(idx);
            }
        }

        let automaton = if patterns.is_empty() {
            None
        } else {
            let pma = AhoCorasickBuilder::new()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
                .map_err(|e| MentionError::Automaton(e.to_string()))?;
            Some(pma)
        };

        Ok(Self {
            rules,
            automaton,
            pattern_rules,
            by_trigger,
            autocomplete,
            separator: None,
        })
    }

    /// Split autocomplete queries on `separator` instead of whitespace.
    ///
    /// A whitespace-only separator keeps whitespace splitting.
    pub fn with_separator(mut self, separator: &str) -> Result<Self> {
        self.separator = if separator.trim().is_empty() {
            None
        } else {
            let re = Regex::new(&regex::escape(separator))
                .map_err(|e| MentionError::Pattern(e.to_string()))?;
            Some(re)
        };
        Ok(self)
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Look up a rule by its trigger sequence
    pub fn rule(&self, trigger: &str) -> Option<&TriggerRule> {
        self.rule_index(trigger).map(|idx| &self.rules[idx])
    }

    pub fn rule_index(&self, trigger: &str) -> Option<usize> {
        self.by_trigger.get(trigger).copied()
    }

    pub fn is_autocomplete(&self) -> bool {
        self.autocomplete.is_some()
    }

    /// Resolve the mention being composed in `preceding_text`.
    ///
    /// `menu_already_open` tells whether the host is showing a menu; while it
    /// is, spaces inside the query are tolerated.
    pub fn resolve(&self, preceding_text: &str, menu_already_open: bool) -> Option<TriggerMatch> {
        if let Some(idx) = self.autocomplete {
            return Some(self.resolve_autocomplete(preceding_text, idx));
        }

        let (start, rule_idx) = self.last_trigger(preceding_text)?;
        let rule = &self.rules[rule_idx];

        let mut query = &preceding_text[start + rule.trigger.len()..];

        if !rule.allow_spaces && query.contains(char::is_whitespace) && !menu_already_open {
            return None;
        }

        let has_trailing_space = !rule.allow_spaces && query.ends_with(char::is_whitespace);
        if has_trailing_space {
            query = query.trim_end();
        }

        Some(TriggerMatch {
            trigger: rule.trigger.clone(),
            start_offset: start,
            query: query.to_string(),
            has_trailing_space,
        })
    }

    /// Resolve against `text` cut at `caret`.
    ///
    /// The caret is clamped to the text and moved back to a char boundary,
    /// so stale offsets from a racing editor never panic.
    pub fn resolve_at(&self, text: &str, caret: usize, menu_already_open: bool) -> Option<TriggerMatch> {
        let mut caret = caret.min(text.len());
        while !text.is_char_boundary(caret) {
            caret -= 1;
        }
        self.resolve(&text[..caret], menu_already_open)
    }

    /// Most recent valid trigger occurrence as (offset, rule index).
    ///
    /// On equal offsets the longer trigger wins, regardless of rule order:
    /// with `$` and `$(` configured, `"calc $(x"` resolves to `$(` with query
    /// `x`, not to `$` with query `(x`.
    fn last_trigger(&self, text: &str) -> Option<(usize, usize)> {
        let pma = self.automaton.as_ref()?;
        let mut best: Option<(usize, usize)> = None;

        for m in pma.find_overlapping_iter(text) {
            let rule_idx = self.pattern_rules[m.pattern().as_usize()];
            let rule = &self.rules[rule_idx];

            if rule.require_leading_space && !preceded_by_whitespace(text, m.start()) {
                continue;
            }

            let replace = match best {
                None => true,
                Some((start, current)) => {
                    m.start() > start
                        || (m.start() == start
                            && rule.trigger.len() > self.rules[current].trigger.len())
                }
            };
            if replace {
                best = Some((m.start(), rule_idx));
            }
        }

        best
    }

    fn resolve_autocomplete(&self, text: &str, rule_idx: usize) -> TriggerMatch {
        let query = self.last_word(text);
        TriggerMatch {
            trigger: self.rules[rule_idx].trigger.clone(),
            start_offset: text.len() - query.len(),
            query: query.to_string(),
            has_trailing_space: false,
        }
    }

    /// Last token of `text`: after the last separator that does not end the
    /// text, or after the last whitespace when no separator is configured.
    fn last_word<'t>(&self, text: &'t str) -> &'t str {
        match &self.separator {
            Some(re) => match re.find_iter(text).filter(|m| m.end() < text.len()).last() {
                Some(m) => &text[m.end()..],
                None => text,
            },
            None => text.rsplit(char::is_whitespace).next().unwrap_or(""),
        }
    }
}

/// True at offset 0 or when the char before `offset` is whitespace
fn preceded_by_whitespace(text: &str, offset: usize) -> bool {
    text[..offset]
        .chars()
        .next_back()
        .map_or(true, char::is_whitespace)
}

/// Resolve with a throwaway resolver built from `rules`
pub fn resolve_trigger(
    preceding_text: &str,
    rules: &[TriggerRule],
    menu_already_open: bool,
) -> Result<Option<TriggerMatch>> {
    let resolver = TriggerResolver::new(rules.to_vec())?;
    Ok(resolver.resolve(preceding_text, menu_already_open))
}

// ==================== TESTS ====================
