//! WASM bindings
//!
//! JS-facing surface over the native core:
//! - `resolveTrigger` / `filterCandidates` / `filterCandidatesAsync`
//! - `MentionSession`: a [`Composer`] over JS values
//!
//! Offsets handed to JS are UTF-16 code units. Logging stays in this layer
//! so the core remains testable off-wasm.

use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

use crate::composer::{Composer, ComposerEvent, QueryTicket, Replacement};
use crate::config::{MentionOptions, SelectContext, SelectTemplate, SurfaceKind, Values};
use crate::error::MentionError;
use crate::search::{
    filter_candidates, FilterOptions, KeyLookup, Lookup, LookupFn, MatchOptions, RankedItem,
};
use crate::trigger::{TriggerMatch, TriggerResolver, TriggerRule};

// ============================================================================
// Conversions
// ============================================================================

fn to_js_error(e: MentionError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn serde_error(e: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Byte offset into `text` as UTF-16 code units
fn utf16_offset(text: &str, byte: usize) -> usize {
    match text.get(..byte) {
        Some(prefix) => prefix.encode_utf16().count(),
        None => text.encode_utf16().count(),
    }
}

impl KeyLookup for JsValue {
    fn lookup_key(&self, key: &str) -> Option<String> {
        let value = Reflect::get(self, &JsValue::from_str(key)).ok()?;
        if let Some(s) = value.as_string() {
            Some(s)
        } else if let Some(n) = value.as_f64() {
            Some(n.to_string())
        } else {
            value.as_bool().map(|b| b.to_string())
        }
    }
}

/// Trigger match with UTF-16 offsets
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsTriggerMatch {
    trigger: String,
    start_offset: usize,
    query_offset: usize,
    end_offset: usize,
    query: String,
    has_trailing_space: bool,
}

impl JsTriggerMatch {
    fn new(text: &str, found: &TriggerMatch) -> Self {
        let range = found.replace_range();
        Self {
            trigger: found.trigger.clone(),
            start_offset: utf16_offset(text, range.start),
            query_offset: utf16_offset(text, found.query_offset()),
            end_offset: utf16_offset(text, range.end),
            query: found.query.clone(),
            has_trailing_space: found.has_trailing_space,
        }
    }
}

/// Replacement with UTF-16 offsets
#[derive(Serialize)]
struct JsReplacement {
    start: usize,
    end: usize,
    text: String,
    caret: usize,
}

impl JsReplacement {
    fn new(text: &str, replacement: &Replacement) -> Self {
        let start = utf16_offset(text, replacement.range.start);
        Self {
            start,
            end: utf16_offset(text, replacement.range.end),
            text: replacement.text.clone(),
            caret: start + replacement.text.encode_utf16().count(),
        }
    }
}

/// Ranked candidate keeping the JS object it came from
#[derive(Serialize)]
struct JsRanked {
    string: String,
    score: f64,
    index: usize,
    #[serde(with = "serde_wasm_bindgen::preserve")]
    original: JsValue,
}

impl JsRanked {
    fn from_ranked(item: &RankedItem<'_, JsValue>) -> Self {
        Self {
            string: item.display_string.clone(),
            score: item.score as f64,
            index: item.source_index,
            original: item.original.clone(),
        }
    }
}

// ============================================================================
// Option Parsing
// ============================================================================

fn shallow_copy(value: &JsValue) -> Object {
    match value.dyn_ref::<Object>() {
        Some(obj) => Object::assign(&Object::new(), obj),
        None => Object::new(),
    }
}

fn type_name(value: &JsValue) -> String {
    if value.is_null() {
        "null".to_string()
    } else {
        value.js_typeof().as_string().unwrap_or_default()
    }
}

/// Elements of a JS array; anything else is an error
fn js_array(value: &JsValue) -> Result<Vec<JsValue>, JsValue> {
    match value.dyn_ref::<Array>() {
        Some(array) => Ok(array.iter().collect()),
        None => Err(to_js_error(MentionError::NotAnArray(type_name(value)))),
    }
}

/// Remove a function-valued property, leaving anything else in place
fn take_function(obj: &Object, key: &str) -> Result<Option<Function>, JsValue> {
    let key = JsValue::from_str(key);
    match Reflect::get(obj, &key)?.dyn_into::<Function>() {
        Ok(func) => {
            Reflect::delete_property(obj, &key)?;
            Ok(Some(func))
        }
        Err(_) => Ok(None),
    }
}

/// `lookup` as a key string or a function. Functions are removed from `obj`.
fn parse_lookup(obj: &Object) -> Result<Option<Lookup<JsValue>>, JsValue> {
    let key = JsValue::from_str("lookup");
    let value = Reflect::get(obj, &key)?;

    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    if let Some(name) = value.as_string() {
        return Ok(Some(Lookup::Key(name)));
    }
    if let Some(func) = value.dyn_ref::<Function>() {
        Reflect::delete_property(obj, &key)?;
        return Ok(Some(Lookup::Function(js_lookup(func.clone()))));
    }

    Err(to_js_error(MentionError::InvalidLookup(type_name(&value))))
}

/// `extract` as an `item => string` function. Removed from `obj`.
fn parse_extract(obj: &Object) -> Result<Option<Lookup<JsValue>>, JsValue> {
    let key = JsValue::from_str("extract");
    let value = Reflect::get(obj, &key)?;

    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    match value.dyn_into::<Function>() {
        Ok(func) => {
            Reflect::delete_property(obj, &key)?;
            Ok(Some(Lookup::function(move |item: &JsValue, _query: &str| {
                func.call1(&JsValue::NULL, item).ok().and_then(|v| v.as_string())
            })))
        }
        Err(value) => Err(to_js_error(MentionError::InvalidLookup(type_name(&value)))),
    }
}

/// Strings are searched as they are, objects by their `key` attribute
fn default_js_lookup() -> Lookup<JsValue> {
    Lookup::function(|item: &JsValue, _query: &str| {
        item.as_string().or_else(|| item.lookup_key("key"))
    })
}

fn js_lookup(func: Function) -> LookupFn<JsValue> {
    Rc::new(move |item: &JsValue, query: &str| {
        func.call2(&JsValue::NULL, item, &JsValue::from_str(query))
            .ok()
            .and_then(|v| v.as_string())
    })
}

fn js_select_template(func: Function) -> SelectTemplate<JsValue> {
    Rc::new(move |item: Option<&JsValue>, ctx: &SelectContext<'_>| {
        let context = Object::new();
        let _ = Reflect::set(&context, &"trigger".into(), &ctx.trigger.into());
        let _ = Reflect::set(&context, &"query".into(), &ctx.query.into());
        let _ = Reflect::set(
            &context,
            &"contentEditable".into(),
            &(ctx.surface == SurfaceKind::ContentEditable).into(),
        );
        let item = item.cloned().unwrap_or(JsValue::UNDEFINED);
        func.call2(&JsValue::NULL, &item, &context)
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default()
    })
}

/// `values`: an array or a provider function. Removed from `obj`.
fn take_values(obj: &Object) -> Result<Option<Values<JsValue>>, JsValue> {
    let key = JsValue::from_str("values");
    let value = Reflect::get(obj, &key)?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }

    Reflect::delete_property(obj, &key)?;
    if value.is_function() {
        Ok(Some(Values::Provider))
    } else {
        Ok(Some(Values::Static(js_array(&value)?)))
    }
}

/// A function-valued `noMatchTemplate` is rendered once into a string
fn resolve_no_match_function(obj: &Object) -> Result<(), JsValue> {
    if let Some(func) = take_function(obj, "noMatchTemplate")? {
        let rendered = func.call0(&JsValue::NULL)?;
        let rendered = rendered.as_string().unwrap_or_default();
        Reflect::set(obj, &"noMatchTemplate".into(), &rendered.into())?;
    }
    Ok(())
}

/// Parts of a collection serde cannot carry
#[derive(Default)]
struct JsExtras {
    values: Option<Values<JsValue>>,
    lookup: Option<Lookup<JsValue>>,
    select_template: Option<Function>,
}

impl JsExtras {
    fn take(obj: &Object) -> Result<Self, JsValue> {
        resolve_no_match_function(obj)?;
        Ok(Self {
            values: take_values(obj)?,
            lookup: parse_lookup(obj)?,
            select_template: take_function(obj, "selectTemplate")?,
        })
    }

    fn lookup_function(&self) -> Option<Lookup<JsValue>> {
        match &self.lookup {
            Some(lookup @ Lookup::Function(_)) => Some(lookup.clone()),
            _ => None,
        }
    }
}

/// Build a composer over JS values from a JS option object
fn build_composer(options: &JsValue, surface: SurfaceKind) -> Result<Composer<JsValue>, JsValue> {
    let copy = shallow_copy(options);
    let mut top = JsExtras::take(&copy)?;

    let mut extras: Vec<JsExtras> = Vec::new();
    let collection_key = JsValue::from_str("collection");
    let items = Reflect::get(&copy, &collection_key)?;
    if Array::is_array(&items) {
        let stripped = Array::new();
        for item in js_array(&items)? {
            let item = shallow_copy(&item);
            extras.push(JsExtras::take(&item)?);
            stripped.push(&item);
        }
        Reflect::set(&copy, &collection_key, &stripped)?;
    }

    let opts: MentionOptions = serde_wasm_bindgen::from_value(copy.into()).map_err(serde_error)?;

    let shorthand = top.values.is_some();
    let mut config = opts
        .build_with(|slot| match slot {
            None => top.values.take(),
            Some(idx) => extras.get_mut(idx).and_then(|e| e.values.take()),
        })
        .map_err(to_js_error)?;

    for (idx, collection) in config.collections.iter_mut().enumerate() {
        let own = if shorthand { None } else { extras.get(idx) };

        if let Some(lookup) = own
            .and_then(JsExtras::lookup_function)
            .or_else(|| top.lookup_function())
        {
            // A collection's own key string still beats a top-level function
            let own_key = own.map_or(false, |e| matches!(e.lookup, Some(Lookup::Key(_))));
            if !own_key {
                collection.lookup = lookup;
            }
        }

        let select = own
            .and_then(|e| e.select_template.clone())
            .or_else(|| top.select_template.clone());
        if let Some(func) = select {
            collection.select_template = Some(js_select_template(func));
        }
    }

    if opts.autocomplete_mode && config.collections.len() > 1 {
        web_sys::console::warn_1(&JsValue::from_str(
            "[MentionSession] Autocomplete mode with several collections: only the first is used",
        ));
    }

    Composer::new(config, surface).map_err(to_js_error)
}

// ============================================================================
// Free Functions
// ============================================================================

/// Resolve the trigger in the text before the caret.
///
/// `rules` is an array of `{ trigger, requireLeadingSpace?, allowSpaces? }`.
/// Returns `null` when no mention is being composed.
#[wasm_bindgen(js_name = resolveTrigger)]
pub fn resolve_trigger_js(
    text: &str,
    rules: JsValue,
    menu_already_open: bool,
    separator: Option<String>,
) -> Result<JsValue, JsValue> {
    let rules: Vec<TriggerRule> = serde_wasm_bindgen::from_value(rules).map_err(serde_error)?;

    let mut resolver = TriggerResolver::new(rules).map_err(to_js_error)?;
    if let Some(sep) = separator {
        resolver = resolver.with_separator(&sep).map_err(to_js_error)?;
    }

    match resolver.resolve(text, menu_already_open) {
        Some(found) => {
            serde_wasm_bindgen::to_value(&JsTriggerMatch::new(text, &found)).map_err(serde_error)
        }
        None => Ok(JsValue::NULL),
    }
}

/// Filter and rank candidates.
///
/// `options`: `{ extract?, lookup?, pre?, post?, skip?, caseSensitive?, separator? }`
/// where `extract` is `item => string` and `lookup` is a key string or
/// `(item, query) => string`; `extract` wins over `lookup`. With neither,
/// string candidates are searched as they are and objects by `key`.
/// Throws when `candidates` is not an array.
/// Returns `[{ string, score, index, original }]`.
#[wasm_bindgen(js_name = filterCandidates)]
pub fn filter_candidates_js(
    query: &str,
    candidates: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let copy = shallow_copy(&options);
    let extract = parse_extract(&copy)?;
    let lookup = match (extract, parse_lookup(&copy)?) {
        (Some(extract), _) => extract,
        (None, Some(lookup)) => lookup,
        (None, None) => default_js_lookup(),
    };
    let matching: MatchOptions =
        serde_wasm_bindgen::from_value(copy.into()).map_err(serde_error)?;

    let items = js_array(&candidates)?;
    let ranked = filter_candidates(query, &items, &FilterOptions::new(lookup, matching));
    let out: Vec<JsRanked> = ranked.iter().map(JsRanked::from_ranked).collect();

    serde_wasm_bindgen::to_value(&out).map_err(serde_error)
}

/// Fetch candidates from `provider(query)` (value or promise), then filter
#[wasm_bindgen(js_name = filterCandidatesAsync)]
pub fn filter_candidates_async(query: String, provider: Function, options: JsValue) -> Promise {
    future_to_promise(async move {
        let pending = provider.call1(&JsValue::NULL, &JsValue::from_str(&query))?;
        let values = JsFuture::from(Promise::resolve(&pending)).await?;
        filter_candidates_js(&query, values, options)
    })
}

// ============================================================================
// Mention Session
// ============================================================================

/// Composition state for one text-entry surface
#[wasm_bindgen]
pub struct MentionSession {
    inner: Composer<JsValue>,
    /// Text of the last update; replacement offsets refer to it
    text: String,
}

#[wasm_bindgen]
impl MentionSession {
    /// `options` follows the mention option bag (`values` or `collection`, ...)
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue, content_editable: bool) -> Result<MentionSession, JsValue> {
        let surface = SurfaceKind::from_content_editable(content_editable);
        Ok(MentionSession {
            inner: build_composer(&options, surface)?,
            text: String::new(),
        })
    }

    /// Feed the text before the caret. Returns `{ type, ... }`.
    #[wasm_bindgen]
    pub fn update(&mut self, text: &str) -> Result<JsValue, JsValue> {
        self.text = text.to_string();
        let event = self.inner.update(text);
        self.event_to_js(&event)
    }

    /// Hand back provider values for a `fetch` event's ticket
    #[wasm_bindgen(js_name = supplyValues)]
    pub fn supply_values(&mut self, ticket: f64, values: JsValue) -> Result<JsValue, JsValue> {
        let event = self
            .inner
            .supply_values(QueryTicket(ticket as u64), js_array(&values)?);
        self.event_to_js(&event)
    }

    /// Current suggestions as `[{ string, score, index, original }]`
    #[wasm_bindgen]
    pub fn suggestions(&self) -> Result<JsValue, JsValue> {
        let out: Vec<JsRanked> = self
            .inner
            .suggestions()
            .iter()
            .enumerate()
            .map(|(i, s)| JsRanked {
                string: s.string.clone(),
                score: s.score as f64,
                index: s.index,
                original: self.inner.item(i).cloned().unwrap_or(JsValue::UNDEFINED),
            })
            .collect();

        match serde_wasm_bindgen::to_value(&out) {
            Ok(v) => Ok(v),
            Err(e) => {
                web_sys::console::error_1(
                    &format!("[MentionSession] Serialization failed: {:?}", e).into(),
                );
                Err(serde_error(e))
            }
        }
    }

    #[wasm_bindgen]
    pub fn selected(&self) -> Option<usize> {
        self.inner.selected()
    }

    #[wasm_bindgen(js_name = selectNext)]
    pub fn select_next(&mut self) -> Option<usize> {
        self.inner.select_next()
    }

    #[wasm_bindgen(js_name = selectPrevious)]
    pub fn select_previous(&mut self) -> Option<usize> {
        self.inner.select_previous()
    }

    /// Commit suggestion `index` (the highlighted one when omitted).
    /// Returns `{ start, end, text, caret }` in UTF-16 units.
    #[wasm_bindgen]
    pub fn select(&mut self, index: Option<usize>) -> Result<JsValue, JsValue> {
        let replacement = match index {
            Some(i) => self.inner.select(i),
            None => self.inner.select_current(),
        }
        .map_err(to_js_error)?;

        serde_wasm_bindgen::to_value(&JsReplacement::new(&self.text, &replacement))
            .map_err(serde_error)
    }

    #[wasm_bindgen]
    pub fn cancel(&mut self) -> bool {
        self.inner.cancel()
    }

    #[wasm_bindgen]
    pub fn append(
        &mut self,
        collection_index: usize,
        values: JsValue,
        replace: bool,
    ) -> Result<(), JsValue> {
        self.inner
            .append(collection_index, js_array(&values)?, replace)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = appendCurrent)]
    pub fn append_current(&mut self, values: JsValue, replace: bool) -> Result<(), JsValue> {
        self.inner
            .append_current(js_array(&values)?, replace)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Current trigger match, or `null`
    #[wasm_bindgen]
    pub fn current(&self) -> Result<JsValue, JsValue> {
        match self.inner.current() {
            Some(comp) => serde_wasm_bindgen::to_value(&JsTriggerMatch::new(&self.text, &comp.found))
                .map_err(serde_error),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen]
    pub fn triggers(&self) -> Vec<String> {
        self.inner
            .config()
            .triggers()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

impl MentionSession {
    fn event_to_js(&self, event: &ComposerEvent) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct Selected<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            replacement: &'a JsReplacement,
        }

        match event {
            ComposerEvent::Selected(replacement) => {
                let replacement = JsReplacement::new(&self.text, replacement);
                serde_wasm_bindgen::to_value(&Selected {
                    kind: "selected",
                    replacement: &replacement,
                })
                .map_err(serde_error)
            }
            other => serde_wasm_bindgen::to_value(other).map_err(serde_error),
        }
    }
}
