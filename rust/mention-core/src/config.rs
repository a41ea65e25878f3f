//! Configuration types and defaults for mention collections
//!
//! Two layers:
//! - [`MentionOptions`]: the serde-facing option bag with every default
//!   filled in, as received from a host (JSON or a JS object)
//! - [`MentionConfig`]: the resolved, typed configuration the composer runs
//!   on, one [`Collection`] per trigger

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::error::{MentionError, Result};
use crate::search::{KeyLookup, Lookup, MatchOptions};
use crate::trigger::{TriggerResolver, TriggerRule};

/// Shown when a query matches nothing
pub const DEFAULT_NO_MATCH_TEMPLATE: &str = "<li>No Match Found!</li>";

fn default_trigger() -> String {
    "@".to_string()
}

fn default_lookup() -> String {
    "key".to_string()
}

fn default_fill_attr() -> String {
    "value".to_string()
}

// =============================================================================
// Surface & Templates
// =============================================================================

/// Kind of text-entry surface a mention is inserted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceKind {
    /// input / textarea
    #[default]
    TextField,
    /// Rich contentEditable region
    ContentEditable,
}

impl SurfaceKind {
    pub fn from_content_editable(content_editable: bool) -> Self {
        if content_editable {
            SurfaceKind::ContentEditable
        } else {
            SurfaceKind::TextField
        }
    }
}

/// What a select template sees about the composition being committed
#[derive(Debug, Clone, Copy)]
pub struct SelectContext<'a> {
    pub trigger: &'a str,
    pub query: &'a str,
    pub fill_attr: &'a str,
    pub surface: SurfaceKind,
}

/// Builds the inserted content from the chosen item (None when nothing is selected)
pub type SelectTemplate<T> = Rc<dyn Fn(Option<&T>, &SelectContext<'_>) -> String>;

/// `trigger + item[fillAttr]`, wrapped in a mention span on contentEditable.
/// Without an item the typed text is kept as is.
pub fn default_select_template<T: KeyLookup>(item: Option<&T>, ctx: &SelectContext<'_>) -> String {
    let Some(item) = item else {
        return format!("{}{}", ctx.trigger, ctx.query);
    };

    let fill = item.lookup_key(ctx.fill_attr).unwrap_or_default();
    match ctx.surface {
        SurfaceKind::ContentEditable => {
            format!("<span class=\"tribute-mention\">{}{}</span>", ctx.trigger, fill)
        }
        SurfaceKind::TextField => format!("{}{}", ctx.trigger, fill),
    }
}

// =============================================================================
// Search Options
// =============================================================================

/// Highlighting and matching options of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchOpts {
    /// Default: `<span>`
    pub pre: String,
    /// Default: `</span>`
    pub post: String,
    pub skip: bool,
    pub case_sensitive: bool,
}

impl Default for SearchOpts {
    fn default() -> Self {
        Self {
            pre: "<span>".to_string(),
            post: "</span>".to_string(),
            skip: false,
            case_sensitive: false,
        }
    }
}

impl SearchOpts {
    /// Matcher options; `separator` is the autocomplete separator, if any
    pub fn match_options(&self, separator: Option<&str>) -> MatchOptions {
        MatchOptions {
            case_sensitive: self.case_sensitive,
            pre: self.pre.clone(),
            post: self.post.clone(),
            skip: self.skip,
            separator: separator.map(str::to_string),
        }
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Where the candidates of a collection come from
#[derive(Debug, Clone, PartialEq)]
pub enum Values<T> {
    /// Held in the configuration
    Static(Vec<T>),
    /// Fetched by the host per query
    Provider,
}

impl<T> Values<T> {
    pub fn is_provider(&self) -> bool {
        matches!(self, Values::Provider)
    }
}

/// Everything a trigger needs: rule, candidates, lookup and menu behavior
pub struct Collection<T> {
    pub rule: TriggerRule,
    pub lookup: Lookup<T>,
    pub fill_attr: String,
    pub values: Values<T>,
    pub search: SearchOpts,
    /// Maximum suggestions shown. None: unlimited
    pub menu_item_limit: Option<usize>,
    /// Minimum query length (chars) before suggestions show
    pub menu_show_min_length: usize,
    /// None disables the no-match state: the composition closes instead
    pub no_match_template: Option<String>,
    pub loading_item_template: Option<String>,
    /// None uses [`default_select_template`]
    pub select_template: Option<SelectTemplate<T>>,
}

impl<T> Collection<T> {
    pub fn new(rule: TriggerRule, values: Values<T>) -> Self {
        Self {
            rule,
            lookup: Lookup::default(),
            fill_attr: default_fill_attr(),
            values,
            search: SearchOpts::default(),
            menu_item_limit: None,
            menu_show_min_length: 0,
            no_match_template: Some(DEFAULT_NO_MATCH_TEMPLATE.to_string()),
            loading_item_template: None,
            select_template: None,
        }
    }

    /// Collection with static candidates
    pub fn with_values(trigger: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(TriggerRule::new(trigger), Values::Static(values))
    }

    /// Collection whose candidates the host fetches per query
    pub fn with_provider(trigger: impl Into<String>) -> Self {
        Self::new(TriggerRule::new(trigger), Values::Provider)
    }

    pub fn trigger(&self) -> &str {
        &self.rule.trigger
    }

    pub fn lookup(mut self, lookup: Lookup<T>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn fill_attr(mut self, fill_attr: impl Into<String>) -> Self {
        self.fill_attr = fill_attr.into();
        self
    }

    pub fn search(mut self, search: SearchOpts) -> Self {
        self.search = search;
        self
    }

    pub fn menu_item_limit(mut self, limit: Option<usize>) -> Self {
        self.menu_item_limit = limit;
        self
    }

    pub fn menu_show_min_length(mut self, min: usize) -> Self {
        self.menu_show_min_length = min;
        self
    }

    /// A blank template disables the no-match state
    pub fn no_match_template(mut self, template: Option<String>) -> Self {
        self.no_match_template = template.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn loading_item_template(mut self, template: Option<String>) -> Self {
        self.loading_item_template = template;
        self
    }

    pub fn select_template<F>(mut self, template: F) -> Self
    where
        F: Fn(Option<&T>, &SelectContext<'_>) -> String + 'static,
    {
        self.select_template = Some(Rc::new(template));
        self
    }

    /// Content inserted when `item` is chosen for `query`
    pub fn select_content(&self, item: Option<&T>, query: &str, surface: SurfaceKind) -> String
    where
        T: KeyLookup,
    {
        let ctx = SelectContext {
            trigger: &self.rule.trigger,
            query,
            fill_attr: &self.fill_attr,
            surface,
        };
        match &self.select_template {
            Some(template) => template(item, &ctx),
            None => default_select_template(item, &ctx),
        }
    }

    /// Static candidates, None for provider-backed collections
    pub fn static_values(&self) -> Option<&[T]> {
        match &self.values {
            Values::Static(values) => Some(values),
            Values::Provider => None,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = match &self.values {
            Values::Static(v) => format!("Static({} items)", v.len()),
            Values::Provider => "Provider".to_string(),
        };
        f.debug_struct("Collection")
            .field("rule", &self.rule)
            .field("lookup", &self.lookup)
            .field("fill_attr", &self.fill_attr)
            .field("values", &values)
            .field("search", &self.search)
            .field("menu_item_limit", &self.menu_item_limit)
            .field("menu_show_min_length", &self.menu_show_min_length)
            .field("no_match_template", &self.no_match_template)
            .field("loading_item_template", &self.loading_item_template)
            .field("select_template", &self.select_template.is_some())
            .finish()
    }
}

// =============================================================================
// Mention Configuration
// =============================================================================

/// Resolved configuration: collections plus behavior shared by all of them
#[derive(Debug)]
pub struct MentionConfig<T> {
    pub collections: Vec<Collection<T>>,
    pub autocomplete_mode: bool,
    pub autocomplete_separator: Option<String>,
    /// None: `" "` for text fields, no-break space for contentEditable
    pub replace_text_suffix: Option<String>,
    pub space_selects_match: bool,
}

impl<T> MentionConfig<T> {
    pub fn new(collections: Vec<Collection<T>>) -> Result<Self> {
        if collections.is_empty() {
            return Err(MentionError::NoCollection);
        }
        Ok(Self {
            collections,
            autocomplete_mode: false,
            autocomplete_separator: None,
            replace_text_suffix: None,
            space_selects_match: false,
        })
    }

    /// Autocomplete mode: every collection loses its trigger and spaces end a word
    pub fn autocomplete(collections: Vec<Collection<T>>) -> Result<Self> {
        let mut config = Self::new(collections)?;
        config.autocomplete_mode = true;
        for collection in &mut config.collections {
            collection.rule = TriggerRule::autocomplete()
                .require_leading_space(collection.rule.require_leading_space);
        }
        Ok(config)
    }

    pub fn autocomplete_separator(mut self, separator: Option<String>) -> Self {
        self.autocomplete_separator = separator;
        self
    }

    pub fn replace_text_suffix(mut self, suffix: Option<String>) -> Self {
        self.replace_text_suffix = suffix;
        self
    }

    pub fn space_selects_match(mut self, enabled: bool) -> Self {
        self.space_selects_match = enabled;
        self
    }

    /// Trigger sequences in collection order
    pub fn triggers(&self) -> Vec<&str> {
        self.collections.iter().map(Collection::trigger).collect()
    }

    /// First collection configured for `trigger`
    pub fn collection_index(&self, trigger: &str) -> Option<usize> {
        self.collections.iter().position(|c| c.trigger() == trigger)
    }

    pub fn collection(&self, index: usize) -> Result<&Collection<T>> {
        self.collections
            .get(index)
            .ok_or(MentionError::InvalidCollectionIndex(index))
    }

    /// Text appended after inserted content
    pub fn suffix(&self, surface: SurfaceKind) -> &str {
        match (&self.replace_text_suffix, surface) {
            (Some(suffix), _) => suffix,
            (None, SurfaceKind::ContentEditable) => "\u{a0}",
            (None, SurfaceKind::TextField) => " ",
        }
    }

    /// Separator handed to the matcher (autocomplete mode only)
    pub fn match_separator(&self) -> Option<&str> {
        if self.autocomplete_mode {
            self.autocomplete_separator.as_deref()
        } else {
            None
        }
    }

    /// Resolver over the collection rules.
    ///
    /// In autocomplete mode all collections share the empty trigger, so a
    /// single autocomplete rule is used.
    pub fn resolver(&self) -> Result<TriggerResolver> {
        if self.autocomplete_mode {
            let resolver = TriggerResolver::new(vec![TriggerRule::autocomplete()])?;
            return match &self.autocomplete_separator {
                Some(sep) => resolver.with_separator(sep),
                None => Ok(resolver),
            };
        }
        let rules = self.collections.iter().map(|c| c.rule.clone()).collect();
        TriggerResolver::new(rules)
    }

    /// Extend or replace the static values of a collection
    pub fn append(&mut self, index: usize, values: Vec<T>, replace: bool) -> Result<()> {
        let collection = self
            .collections
            .get_mut(index)
            .ok_or(MentionError::InvalidCollectionIndex(index))?;

        match &mut collection.values {
            Values::Provider => Err(MentionError::ProviderValues(index)),
            Values::Static(existing) => {
                if replace {
                    *existing = values;
                } else {
                    existing.extend(values);
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// Option Bag
// =============================================================================

/// Per-collection options; unset fields fall back to the top-level value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionOptions {
    pub trigger: Option<String>,
    pub lookup: Option<String>,
    pub fill_attr: Option<String>,
    pub values: Option<Vec<Value>>,
    pub no_match_template: Option<String>,
    pub loading_item_template: Option<String>,
    pub require_leading_space: Option<bool>,
    pub search_opts: Option<SearchOpts>,
    pub menu_item_limit: Option<usize>,
    pub menu_show_min_length: Option<usize>,
}

/// Top-level options with all defaults filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentionOptions {
    /// Default: `@`
    pub trigger: String,
    pub autocomplete_mode: bool,
    pub autocomplete_separator: Option<String>,
    /// Attribute searched. Default: `key`
    pub lookup: String,
    /// Attribute inserted. Default: `value`
    pub fill_attr: String,
    /// Single-collection shorthand
    pub values: Option<Vec<Value>>,
    pub collection: Option<Vec<CollectionOptions>>,
    /// None: default template. Blank: disabled
    pub no_match_template: Option<String>,
    pub loading_item_template: Option<String>,
    /// Default: true
    pub require_leading_space: bool,
    pub allow_spaces: bool,
    pub replace_text_suffix: Option<String>,
    pub space_selects_match: bool,
    pub search_opts: SearchOpts,
    pub menu_item_limit: Option<usize>,
    pub menu_show_min_length: usize,
}

impl Default for MentionOptions {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            autocomplete_mode: false,
            autocomplete_separator: None,
            lookup: default_lookup(),
            fill_attr: default_fill_attr(),
            values: None,
            collection: None,
            no_match_template: None,
            loading_item_template: None,
            require_leading_space: true,
            allow_spaces: false,
            replace_text_suffix: None,
            space_selects_match: false,
            search_opts: SearchOpts::default(),
            menu_item_limit: None,
            menu_show_min_length: 0,
        }
    }
}

impl MentionOptions {
    /// Single collection of static values under the default trigger
    pub fn with_values(values: Vec<Value>) -> Self {
        Self {
            values: Some(values),
            ..Self::default()
        }
    }

    fn resolve_no_match(template: Option<&String>) -> Option<String> {
        match template {
            None => Some(DEFAULT_NO_MATCH_TEMPLATE.to_string()),
            Some(t) if t.trim().is_empty() => None,
            Some(t) => Some(t.clone()),
        }
    }

    /// Resolve into a typed configuration over the JSON values in the options.
    pub fn build(&self) -> Result<MentionConfig<Value>> {
        self.build_with(|slot| {
            let values = match slot {
                None => self.values.as_ref(),
                Some(idx) => self
                    .collection
                    .as_ref()
                    .and_then(|items| items.get(idx))
                    .and_then(|item| item.values.as_ref()),
            };
            values.map(|v| Values::Static(v.clone()))
        })
    }

    /// Resolve with values supplied by the caller.
    ///
    /// `source(None)` asks for the single-collection shorthand values,
    /// `source(Some(i))` for those of `collection[i]`. Shorthand values win
    /// over `collection`; neither is an error.
    pub fn build_with<T, F>(&self, mut source: F) -> Result<MentionConfig<T>>
    where
        F: FnMut(Option<usize>) -> Option<Values<T>>,
    {
        // Autocomplete mode never allows spaces in a word
        let allow_spaces = self.allow_spaces && !self.autocomplete_mode;

        let collections = if let Some(values) = source(None) {
            let rule = TriggerRule::new(self.trigger.clone())
                .require_leading_space(self.require_leading_space)
                .allow_spaces(allow_spaces);

            vec![Collection::new(rule, values)
                .lookup(Lookup::Key(self.lookup.clone()))
                .fill_attr(self.fill_attr.clone())
                .search(self.search_opts.clone())
                .menu_item_limit(self.menu_item_limit)
                .menu_show_min_length(self.menu_show_min_length)
                .no_match_template(Self::resolve_no_match(self.no_match_template.as_ref()))
                .loading_item_template(self.loading_item_template.clone())]
        } else if let Some(items) = &self.collection {
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    let values = source(Some(idx)).unwrap_or(Values::Static(Vec::new()));
                    self.build_collection(item, values, allow_spaces)
                })
                .collect()
        } else {
            return Err(MentionError::NoCollection);
        };

        let config = if self.autocomplete_mode {
            MentionConfig::autocomplete(collections)?
        } else {
            MentionConfig::new(collections)?
        };

        Ok(config
            .autocomplete_separator(self.autocomplete_separator.clone())
            .replace_text_suffix(self.replace_text_suffix.clone())
            .space_selects_match(self.space_selects_match))
    }

    fn build_collection<T>(
        &self,
        item: &CollectionOptions,
        values: Values<T>,
        allow_spaces: bool,
    ) -> Collection<T> {
        let trigger = item
            .trigger
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.trigger.clone());
        let rule = TriggerRule::new(trigger)
            .require_leading_space(item.require_leading_space.unwrap_or(self.require_leading_space))
            .allow_spaces(allow_spaces);

        let no_match = item.no_match_template.as_ref().or(self.no_match_template.as_ref());

        Collection::new(rule, values)
            .lookup(Lookup::Key(
                item.lookup.clone().unwrap_or_else(|| self.lookup.clone()),
            ))
            .fill_attr(item.fill_attr.clone().unwrap_or_else(|| self.fill_attr.clone()))
            .search(item.search_opts.clone().unwrap_or_else(|| self.search_opts.clone()))
            .menu_item_limit(item.menu_item_limit.or(self.menu_item_limit))
            .menu_show_min_length(item.menu_show_min_length.unwrap_or(self.menu_show_min_length))
            .no_match_template(Self::resolve_no_match(no_match))
            .loading_item_template(item.loading_item_template.clone())
    }
}
