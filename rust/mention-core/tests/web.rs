//! Browser-side tests for the JS bindings
//!
//! Run with `wasm-pack test --headless --firefox rust/mention-core`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Function, Object, Reflect};
use mention_core::wasm::{filter_candidates_js, resolve_trigger_js, MentionSession};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn get(value: &JsValue, key: &str) -> JsValue {
    Reflect::get(value, &JsValue::from_str(key)).unwrap()
}

fn person(key: &str, value: &str) -> JsValue {
    let obj = Object::new();
    Reflect::set(&obj, &"key".into(), &key.into()).unwrap();
    Reflect::set(&obj, &"value".into(), &value.into()).unwrap();
    obj.into()
}

fn people() -> Array {
    let arr = Array::new();
    arr.push(&person("Jordan Humphreys", "Jordan"));
    arr.push(&person("Sir Walter Riley", "Sir Walter"));
    arr.push(&person("Joachim", "Joachim"));
    arr
}

fn rules(triggers: &[&str]) -> JsValue {
    let arr = Array::new();
    for t in triggers {
        let rule = Object::new();
        Reflect::set(&rule, &"trigger".into(), &(*t).into()).unwrap();
        arr.push(&rule);
    }
    arr.into()
}

#[wasm_bindgen_test]
fn resolve_trigger_returns_utf16_offsets() {
    // "😀" is two UTF-16 units and four UTF-8 bytes
    let found = resolve_trigger_js("😀 @jo", rules(&["@"]), false, None).unwrap();
    assert_eq!(get(&found, "query").as_string().unwrap(), "jo");
    assert_eq!(get(&found, "startOffset").as_f64().unwrap(), 3.0);
    assert_eq!(get(&found, "endOffset").as_f64().unwrap(), 6.0);
}

#[wasm_bindgen_test]
fn resolve_trigger_none_is_null() {
    let found = resolve_trigger_js("hello $", rules(&["$("]), false, None).unwrap();
    assert!(found.is_null());
}

#[wasm_bindgen_test]
fn filter_with_key_lookup_keeps_originals() {
    let options = Object::new();
    Reflect::set(&options, &"pre".into(), &"<b>".into()).unwrap();
    Reflect::set(&options, &"post".into(), &"</b>".into()).unwrap();

    let candidates = people();
    let result = filter_candidates_js("jo", candidates.clone().into(), options.into()).unwrap();
    let result = Array::from(&result);

    assert_eq!(result.length(), 2);
    let first = result.get(0);
    assert_eq!(
        get(&first, "string").as_string().unwrap(),
        "<b>J</b><b>o</b>rdan Humphreys"
    );
    assert_eq!(get(&first, "index").as_f64().unwrap(), 0.0);
    assert!(Object::is(&get(&first, "original"), &candidates.get(0)));
}

#[wasm_bindgen_test]
fn filter_with_function_lookup() {
    let options = Object::new();
    let lookup = Function::new_with_args("item, query", "return item.value");
    Reflect::set(&options, &"lookup".into(), &lookup).unwrap();

    let result = filter_candidates_js("walt", people().into(), options.into()).unwrap();
    assert_eq!(Array::from(&result).length(), 1);
}

#[wasm_bindgen_test]
fn filter_rejects_bad_lookup() {
    let options = Object::new();
    Reflect::set(&options, &"lookup".into(), &JsValue::from_f64(3.0)).unwrap();
    assert!(filter_candidates_js("a", people().into(), options.into()).is_err());
}

#[wasm_bindgen_test]
fn filter_plain_strings_without_lookup() {
    let candidates = Array::of2(&"abc".into(), &"xyz".into());
    let result = filter_candidates_js("a", candidates.into(), Object::new().into()).unwrap();
    let result = Array::from(&result);

    assert_eq!(result.length(), 1);
    assert_eq!(get(&result.get(0), "string").as_string().unwrap(), "abc");
    assert_eq!(get(&result.get(0), "index").as_f64().unwrap(), 0.0);
}

#[wasm_bindgen_test]
fn filter_with_extract_wins_over_lookup() {
    let options = Object::new();
    let extract = Function::new_with_args("item", "return item.value");
    Reflect::set(&options, &"extract".into(), &extract).unwrap();
    Reflect::set(&options, &"lookup".into(), &"key".into()).unwrap();

    // "Riley" is only in the `key` attribute
    let result = filter_candidates_js("riley", people().into(), options.clone().into()).unwrap();
    assert_eq!(Array::from(&result).length(), 0);

    let result = filter_candidates_js("walt", people().into(), options.into()).unwrap();
    assert_eq!(Array::from(&result).length(), 1);
}

#[wasm_bindgen_test]
fn filter_rejects_bad_extract() {
    let options = Object::new();
    Reflect::set(&options, &"extract".into(), &"value".into()).unwrap();
    assert!(filter_candidates_js("a", people().into(), options.into()).is_err());
}

#[wasm_bindgen_test]
fn filter_rejects_non_array_candidates() {
    let err = filter_candidates_js("a", JsValue::from_str("abc"), Object::new().into()).unwrap_err();
    assert!(err.as_string().unwrap().contains("array"));
    assert!(filter_candidates_js("a", JsValue::UNDEFINED, Object::new().into()).is_err());
}

#[wasm_bindgen_test]
fn session_rejects_non_array_values() {
    let options = Object::new();
    Reflect::set(&options, &"values".into(), &people()).unwrap();
    let mut session = MentionSession::new(options.into(), false).unwrap();

    assert!(session.append(0, JsValue::from_f64(1.0), false).is_err());
    assert!(session.supply_values(1.0, JsValue::NULL).is_err());

    let bad = Object::new();
    Reflect::set(&bad, &"values".into(), &"Jordan".into()).unwrap();
    assert!(MentionSession::new(bad.into(), false).is_err());
}

#[wasm_bindgen_test]
fn session_select_round_trip() {
    let options = Object::new();
    Reflect::set(&options, &"values".into(), &people()).unwrap();
    let mut session = MentionSession::new(options.into(), false).unwrap();

    let event = session.update("hi @sir").unwrap();
    assert_eq!(get(&event, "type").as_string().unwrap(), "suggestions");
    assert!(session.is_active());

    let splice = session.select(None).unwrap();
    assert_eq!(get(&splice, "text").as_string().unwrap(), "@Sir Walter ");
    assert_eq!(get(&splice, "start").as_f64().unwrap(), 3.0);
    assert_eq!(get(&splice, "end").as_f64().unwrap(), 7.0);
    assert!(!session.is_active());
}

#[wasm_bindgen_test]
fn session_requires_collection() {
    assert!(MentionSession::new(Object::new().into(), false).is_err());
}
