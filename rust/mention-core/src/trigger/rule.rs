//! Trigger rules and the match a rule produces

use serde::{Deserialize, Serialize};
use std::ops::Range;

fn default_true() -> bool {
    true
}

// =============================================================================
// Trigger Rule
// =============================================================================

/// One configured trigger. An empty `trigger` selects autocomplete mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRule {
    /// Literal trigger sequence, e.g. `@` or `$(`
    #[serde(default)]
    pub trigger: String,
    /// Trigger must sit at offset 0 or after whitespace. Default: true
    #[serde(default = "default_true")]
    pub require_leading_space: bool,
    /// Query may contain spaces. Default: false
    #[serde(default)]
    pub allow_spaces: bool,
}

impl TriggerRule {
    pub fn new(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            require_leading_space: true,
            allow_spaces: false,
        }
    }

    /// Rule for autocomplete mode (no trigger sequence)
    pub fn autocomplete() -> Self {
        Self::new("")
    }

    pub fn require_leading_space(mut self, require: bool) -> Self {
        self.require_leading_space = require;
        self
    }

    pub fn allow_spaces(mut self, allow: bool) -> Self {
        self.allow_spaces = allow;
        self
    }

    pub fn is_autocomplete(&self) -> bool {
        self.trigger.is_empty()
    }
}

impl Default for TriggerRule {
    fn default() -> Self {
        Self::new("@")
    }
}

// =============================================================================
// Trigger Match
// =============================================================================

/// A mention being composed, recomputed from scratch on every text change.
///
/// Offsets are byte offsets into the text preceding the caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMatch {
    /// Trigger sequence that started the mention (empty in autocomplete mode)
    pub trigger: String,
    /// Where the trigger begins
    pub start_offset: usize,
    /// Text typed after the trigger
    pub query: String,
    /// The query ended in whitespace that was stripped
    pub has_trailing_space: bool,
}

impl TriggerMatch {
    /// Span replaced when a suggestion is chosen: trigger plus query.
    ///
    /// A stripped trailing space stays outside the span.
    pub fn replace_range(&self) -> Range<usize> {
        let end = self.start_offset + self.trigger.len() + self.query.len();
        self.start_offset..end
    }

    /// Byte offset where the query starts
    pub fn query_offset(&self) -> usize {
        self.start_offset + self.trigger.len()
    }
}
