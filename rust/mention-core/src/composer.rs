//! Composer - Per-surface composition state machine
//!
//! Drives trigger resolution and filtering on every text change and turns a
//! chosen suggestion into a text splice.
//!
//! ```text
//! IDLE --trigger typed--> COMPOSING --select / space / cancel / no trigger--> IDLE
//! ```
//!
//! The composer never touches a DOM: the host feeds it the text before the
//! caret and applies the returned [`Replacement`].

use serde::Serialize;
use std::ops::Range;

use crate::config::{Collection, MentionConfig, SurfaceKind, Values};
use crate::error::{MentionError, Result};
use crate::search::{filter, KeyLookup, RankedItem, Suggestion};
use crate::trigger::{TriggerMatch, TriggerResolver};

// ==================== TYPE DEFINITIONS ====================

/// Identifies one provider request. Values supplied for an older ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueryTicket(pub u64);

/// Text splice committing a mention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    /// Byte range of the pre-caret text being replaced
    pub range: Range<usize>,
    /// Inserted content, suffix included
    pub text: String,
    /// Caret position after the splice
    pub caret: usize,
}

impl Replacement {
    pub fn new(range: Range<usize>, text: String) -> Self {
        let caret = range.start + text.len();
        Self { range, text, caret }
    }

    /// Splice into `field`. Offsets past the end or inside a char are clamped down.
    pub fn apply(&self, field: &str) -> String {
        let end = floor_char_boundary(field, self.range.end);
        let start = floor_char_boundary(field, self.range.start.min(end));

        let mut out = String::with_capacity(field.len() - (end - start) + self.text.len());
        out.push_str(&field[..start]);
        out.push_str(&self.text);
        out.push_str(&field[end..]);
        out
    }
}

fn floor_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Outcome of feeding the composer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComposerEvent {
    /// Nothing being composed, nothing was
    Idle,
    /// The active composition ended without a selection
    Closed,
    /// Same trigger and query as before
    Unchanged,
    /// Suggestions are ready, highlight reset to the first
    Suggestions { count: usize },
    /// No candidate matched; show the template
    NoMatch { template: String },
    /// Host must fetch candidates for `query` and hand them back with the ticket
    Fetch {
        ticket: QueryTicket,
        query: String,
        loading_template: Option<String>,
    },
    /// Space committed the highlighted suggestion
    Selected(Replacement),
    /// Supplied values belong to a finished or superseded query
    Stale,
}

/// An active composition
#[derive(Debug, Clone)]
pub struct Composition<T> {
    pub collection: usize,
    pub found: TriggerMatch,
    pub suggestions: Vec<Suggestion>,
    pub selected: usize,
    pending: Option<QueryTicket>,
    /// Provider values the suggestions index into
    fetched: Option<Vec<T>>,
}

impl<T> Composition<T> {
    fn new(collection: usize, found: TriggerMatch) -> Self {
        Self {
            collection,
            found,
            suggestions: Vec::new(),
            selected: 0,
            pending: None,
            fetched: None,
        }
    }

    fn source<'a>(&'a self, collection: &'a Collection<T>) -> &'a [T] {
        self.fetched
            .as_deref()
            .or_else(|| collection.static_values())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub enum CompositionState<T> {
    Idle,
    Composing(Composition<T>),
}

// ==================== COMPOSER ====================

/// Composition driver for one text-entry surface
#[derive(Debug)]
pub struct Composer<T> {
    config: MentionConfig<T>,
    resolver: TriggerResolver,
    surface: SurfaceKind,
    state: CompositionState<T>,
    next_ticket: u64,
}

impl<T: KeyLookup> Composer<T> {
    pub fn new(config: MentionConfig<T>, surface: SurfaceKind) -> Result<Self> {
        let resolver = config.resolver()?;
        Ok(Self {
            config,
            resolver,
            surface,
            state: CompositionState::Idle,
            next_ticket: 0,
        })
    }

    pub fn config(&self) -> &MentionConfig<T> {
        &self.config
    }

    pub fn surface(&self) -> SurfaceKind {
        self.surface
    }

    pub fn state(&self) -> &CompositionState<T> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CompositionState::Composing(_))
    }

    /// The active composition
    pub fn current(&self) -> Option<&Composition<T>> {
        match &self.state {
            CompositionState::Composing(comp) => Some(comp),
            CompositionState::Idle => None,
        }
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        self.current().map_or(&[], |comp| comp.suggestions.as_slice())
    }

    /// Highlighted suggestion index
    pub fn selected(&self) -> Option<usize> {
        self.current()
            .filter(|comp| !comp.suggestions.is_empty())
            .map(|comp| comp.selected)
    }

    /// Source item behind suggestion `index`
    pub fn item(&self, index: usize) -> Option<&T> {
        let comp = self.current()?;
        let collection = self.config.collections.get(comp.collection)?;
        let suggestion = comp.suggestions.get(index)?;
        comp.source(collection).get(suggestion.index)
    }

    /// Feed the text preceding the caret
    pub fn update(&mut self, preceding_text: &str) -> ComposerEvent {
        let was_active = self.is_active();

        let Some(found) = self.resolver.resolve(preceding_text, was_active) else {
            return self.close(was_active);
        };
        let Some(idx) = self.config.collection_index(&found.trigger) else {
            return self.close(was_active);
        };

        if found.has_trailing_space {
            let has_suggestions = !self.suggestions().is_empty();
            if was_active && has_suggestions && self.config.space_selects_match {
                if let CompositionState::Composing(comp) = &mut self.state {
                    comp.found = found;
                }
                let selected = self.selected().unwrap_or(0);
                // The typed whitespace is consumed along with the query
                return match self.finish(selected, Some(preceding_text.len())) {
                    Ok(replacement) => ComposerEvent::Selected(replacement),
                    Err(_) => self.close(was_active),
                };
            }
            return self.close(was_active);
        }

        let min_length = self.config.collections[idx].menu_show_min_length;
        if found.query.chars().count() < min_length {
            return self.close(was_active);
        }

        if let CompositionState::Composing(comp) = &self.state {
            if comp.collection == idx && comp.found == found {
                return ComposerEvent::Unchanged;
            }
        }

        let collection = &self.config.collections[idx];
        let suggestions = match &collection.values {
            Values::Static(values) => {
                rank(collection, &found.query, values, self.config.match_separator())
            }
            Values::Provider => {
                let loading_template = collection.loading_item_template.clone();
                let ticket = self.issue_ticket();
                let query = found.query.clone();

                let mut comp = Composition::new(idx, found);
                comp.pending = Some(ticket);
                self.state = CompositionState::Composing(comp);

                return ComposerEvent::Fetch {
                    ticket,
                    query,
                    loading_template,
                };
            }
        };

        self.show(Composition::new(idx, found), suggestions)
    }

    /// Hand back provider values for `ticket`
    pub fn supply_values(&mut self, ticket: QueryTicket, values: Vec<T>) -> ComposerEvent {
        let (idx, found) = match &self.state {
            CompositionState::Composing(comp) if comp.pending == Some(ticket) => {
                (comp.collection, comp.found.clone())
            }
            _ => return ComposerEvent::Stale,
        };

        let suggestions = rank(
            &self.config.collections[idx],
            &found.query,
            &values,
            self.config.match_separator(),
        );

        let mut comp = Composition::new(idx, found);
        comp.fetched = Some(values);
        self.show(comp, suggestions)
    }

    /// Move the highlight down, wrapping to the top
    pub fn select_next(&mut self) -> Option<usize> {
        self.move_selection(true)
    }

    /// Move the highlight up, wrapping to the bottom
    pub fn select_previous(&mut self) -> Option<usize> {
        self.move_selection(false)
    }

    /// Commit suggestion `index`. An index without a suggestion keeps the typed text.
    pub fn select(&mut self, index: usize) -> Result<Replacement> {
        self.finish(index, None)
    }

    /// Commit the highlighted suggestion
    pub fn select_current(&mut self) -> Result<Replacement> {
        let selected = self.selected().unwrap_or(0);
        self.select(selected)
    }

    /// Abandon the composition
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = CompositionState::Idle;
        was_active
    }

    /// Extend or replace static values of collection `index`
    pub fn append(&mut self, index: usize, values: Vec<T>, replace: bool) -> Result<()> {
        self.config.append(index, values, replace)
    }

    /// Extend or replace static values of the active collection
    pub fn append_current(&mut self, values: Vec<T>, replace: bool) -> Result<()> {
        let idx = self
            .current()
            .map(|comp| comp.collection)
            .ok_or(MentionError::NoActiveComposition)?;
        self.config.append(idx, values, replace)
    }

    // ==================== INTERNALS ====================

    fn issue_ticket(&mut self) -> QueryTicket {
        self.next_ticket += 1;
        QueryTicket(self.next_ticket)
    }

    fn close(&mut self, was_active: bool) -> ComposerEvent {
        self.state = CompositionState::Idle;
        if was_active {
            ComposerEvent::Closed
        } else {
            ComposerEvent::Idle
        }
    }

    fn show(&mut self, mut comp: Composition<T>, suggestions: Vec<Suggestion>) -> ComposerEvent {
        if suggestions.is_empty() {
            let template = self.config.collections[comp.collection]
                .no_match_template
                .clone();
            return match template {
                Some(template) => {
                    self.state = CompositionState::Composing(comp);
                    ComposerEvent::NoMatch { template }
                }
                None => {
                    self.state = CompositionState::Idle;
                    ComposerEvent::Closed
                }
            };
        }

        let count = suggestions.len();
        comp.suggestions = suggestions;
        comp.selected = 0;
        self.state = CompositionState::Composing(comp);
        ComposerEvent::Suggestions { count }
    }

    fn move_selection(&mut self, forward: bool) -> Option<usize> {
        let CompositionState::Composing(comp) = &mut self.state else {
            return None;
        };
        let count = comp.suggestions.len();
        if count == 0 {
            return None;
        }

        comp.selected = if forward {
            (comp.selected + 1) % count
        } else {
            (comp.selected + count - 1) % count
        };
        Some(comp.selected)
    }

    fn finish(&mut self, index: usize, consume_to: Option<usize>) -> Result<Replacement> {
        let comp = match std::mem::replace(&mut self.state, CompositionState::Idle) {
            CompositionState::Composing(comp) => comp,
            CompositionState::Idle => return Err(MentionError::NoActiveComposition),
        };

        let collection = self.config.collection(comp.collection)?;
        let item = comp
            .suggestions
            .get(index)
            .and_then(|s| comp.source(collection).get(s.index));

        let content = collection.select_content(item, &comp.found.query, self.surface);
        let text = format!("{}{}", content, self.config.suffix(self.surface));

        let mut range = comp.found.replace_range();
        if let Some(end) = consume_to {
            range.end = range.end.max(end);
        }

        Ok(Replacement::new(range, text))
    }
}

/// Filter `values` for `query` and apply the item limit
fn rank<T: KeyLookup>(
    collection: &Collection<T>,
    query: &str,
    values: &[T],
    separator: Option<&str>,
) -> Vec<Suggestion> {
    let opts = collection.search.match_options(separator);
    let ranked = filter(query, values, collection.lookup.extractor(query), &opts);
    // A zero limit means unlimited
    let limit = collection
        .menu_item_limit
        .filter(|&limit| limit > 0)
        .unwrap_or(usize::MAX);

    ranked.iter().take(limit).map(RankedItem::detach).collect()
}
