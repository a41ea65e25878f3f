//! Batch filtering and ranking over arbitrary items
//!
//! Items are turned into strings by an extraction function (or a configured
//! [`Lookup`]), matched with [`match_one`], and ranked by score descending.
//! Equal scores keep input order.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::matcher::{match_one, MatchOptions};

// ==================== RANKED RESULTS ====================

/// One surviving candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem<'a, T> {
    /// Rendered (highlighted) candidate string
    #[serde(rename = "string")]
    pub display_string: String,
    pub score: u64,
    /// Position in the input slice
    #[serde(rename = "index")]
    pub source_index: usize,
    pub original: &'a T,
}

impl<T> RankedItem<'_, T> {
    /// Drop the borrow of the source item
    pub fn detach(&self) -> Suggestion {
        Suggestion {
            string: self.display_string.clone(),
            score: self.score,
            index: self.source_index,
        }
    }
}

/// A ranked item that no longer borrows its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub string: String,
    pub score: u64,
    pub index: usize,
}

/// Match every candidate and rank the survivors.
///
/// `extract` yielding `None` is treated as the empty string. No limit is
/// applied here.
pub fn filter<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    extract: F,
    opts: &MatchOptions,
) -> Vec<RankedItem<'a, T>>
where
    F: Fn(&T) -> Option<String>,
{
    let mut ranked: Vec<RankedItem<'a, T>> = candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let text = extract(item).unwrap_or_default();
            match_one(query, &text, opts).map(|m| RankedItem {
                display_string: m.rendered,
                score: m.score,
                source_index: idx,
                original: item,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.source_index.cmp(&b.source_index))
    });

    ranked
}

// ==================== LOOKUP ====================

/// Read a named string attribute off an item
pub trait KeyLookup {
    fn lookup_key(&self, key: &str) -> Option<String>;
}

impl KeyLookup for Value {
    fn lookup_key(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// A plain string has no attributes
impl KeyLookup for String {
    fn lookup_key(&self, _key: &str) -> Option<String> {
        None
    }
}

impl KeyLookup for &str {
    fn lookup_key(&self, _key: &str) -> Option<String> {
        None
    }
}

impl KeyLookup for HashMap<String, String> {
    fn lookup_key(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl KeyLookup for BTreeMap<String, String> {
    fn lookup_key(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Lookup function: `(item, query) -> searchable string`
pub type LookupFn<T> = Rc<dyn Fn(&T, &str) -> Option<String>>;

/// How a searchable string is obtained from an item
pub enum Lookup<T> {
    /// Named attribute, read through [`KeyLookup`]
    Key(String),
    /// Caller-supplied function
    Function(LookupFn<T>),
}

impl<T> Lookup<T> {
    pub fn key(key: impl Into<String>) -> Self {
        Lookup::Key(key.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&T, &str) -> Option<String> + 'static,
    {
        Lookup::Function(Rc::new(f))
    }

    /// Resolve into an extraction closure for one query
    pub fn extractor<'a>(&'a self, query: &'a str) -> Box<dyn Fn(&T) -> Option<String> + 'a>
    where
        T: KeyLookup,
    {
        self.extractor_with(query, |item: &T, key: &str| item.lookup_key(key))
    }

    /// Like [`Lookup::extractor`], with `read_key` reading `Key` attributes
    pub fn extractor_with<'a, K>(
        &'a self,
        query: &'a str,
        read_key: K,
    ) -> Box<dyn Fn(&T) -> Option<String> + 'a>
    where
        K: Fn(&T, &str) -> Option<String> + 'a,
    {
        match self {
            Lookup::Key(key) => Box::new(move |item: &T| read_key(item, key)),
            Lookup::Function(f) => Box::new(move |item: &T| f(item, query)),
        }
    }
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Lookup::Key("key".to_string())
    }
}

impl<T> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        match self {
            Lookup::Key(key) => Lookup::Key(key.clone()),
            Lookup::Function(f) => Lookup::Function(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Lookup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Lookup::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Lookup plus match options for [`filter_candidates`]
#[derive(Debug)]
pub struct FilterOptions<T> {
    pub lookup: Lookup<T>,
    pub matching: MatchOptions,
}

impl<T> FilterOptions<T> {
    pub fn new(lookup: Lookup<T>, matching: MatchOptions) -> Self {
        Self { lookup, matching }
    }
}

impl<T> Default for FilterOptions<T> {
    fn default() -> Self {
        Self::new(Lookup::default(), MatchOptions::default())
    }
}

impl<T> Clone for FilterOptions<T> {
    fn clone(&self) -> Self {
        Self::new(self.lookup.clone(), self.matching.clone())
    }
}

/// Filter with a configured lookup
pub fn filter_candidates<'a, T: KeyLookup>(
    query: &str,
    candidates: &'a [T],
    opts: &FilterOptions<T>,
) -> Vec<RankedItem<'a, T>> {
    filter_candidates_with(query, candidates, opts, |item: &T, key: &str| item.lookup_key(key))
}

/// Filter items without [`KeyLookup`]; `read_key` serves `Lookup::Key`
pub fn filter_candidates_with<'a, T, K>(
    query: &str,
    candidates: &'a [T],
    opts: &FilterOptions<T>,
    read_key: K,
) -> Vec<RankedItem<'a, T>>
where
    K: Fn(&T, &str) -> Option<String>,
{
    let extract = opts.lookup.extractor_with(query, read_key);
    filter(query, candidates, extract, &opts.matching)
}
