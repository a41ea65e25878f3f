//! MentionCore: Trigger Detection + Fuzzy Ranking for @mention autocomplete
//!
//! A Rust/WASM core for in-place mention menus on text fields and
//! contentEditable regions.
//!
//! # Architecture
//! - `trigger/` - TriggerResolver: finds the active trigger and query before the caret
//! - `search/matcher.rs` - Subsequence matching with contiguity scoring and highlighting
//! - `search/filter.rs` - Batch filtering, stable ranking, key/function lookups
//! - `config.rs` - Option bag, defaults and per-trigger collections
//! - `composer.rs` - Composition state machine (IDLE / COMPOSING) and text splices
//! - `wasm.rs` - JS bindings (`resolveTrigger`, `filterCandidates`, `MentionSession`)
//! - `error.rs` - MentionError
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { MentionSession } from 'mention-core';
//!
//! await init();
//!
//! const session = new MentionSession({
//!   values: [{ key: 'Jordan Humphreys', value: 'Jordan' }],
//! }, false);
//!
//! const event = session.update(input.value.slice(0, input.selectionStart));
//! if (event.type === 'suggestions') render(session.suggestions());
//!
//! // { start, end, text, caret } in UTF-16 units
//! const splice = session.select();
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod search;
pub mod trigger;
pub mod wasm;

pub use composer::*;
pub use config::*;
pub use error::{MentionError, Result};
pub use search::*;
pub use trigger::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("mention-core v{}", env!("CARGO_PKG_VERSION"))
}
