//! WebAssembly bindings for the redirect matcher

use std::sync::OnceLock;
use wasm_bindgen::prelude::*;
use rr_compiler::{compile_redirects as compile_csv, RedirectOptions};
use rr_core::{
    ExclusionReason,
    MatchResult,
    Matcher,
    RedirectIndex,
    RequestContext,
    RuleKind,
    Snapshot,
};

struct MatcherState {
    index: &'static RedirectIndex,
    matcher: &'static Matcher<'static>,
}

static MATCHER_STATE: OnceLock<MatcherState> = OnceLock::new();

/// Load an index produced by `compile_redirects` or the CLI.
#[wasm_bindgen]
pub fn init(index_data: &str) -> Result<(), JsValue> {
    if MATCHER_STATE.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload to reinitialize."));
    }

    let snapshot = Snapshot::load(index_data)
        .map_err(|e| JsValue::from_str(&format!("Failed to load index: {}", e)))?;

    let index: &'static RedirectIndex = Box::leak(Box::new(snapshot.into_index()));

    let matcher: &'static Matcher<'static> = Box::leak(Box::new(
        Matcher::new(index)
            .map_err(|e| JsValue::from_str(&format!("Failed to compile index: {}", e)))?
    ));

    MATCHER_STATE.set(MatcherState { index, matcher })
        .map_err(|_| JsValue::from_str("Failed to set matcher state"))?;

    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    MATCHER_STATE.get().is_some()
}

#[wasm_bindgen]
pub fn get_index_info() -> JsValue {
    let result = js_sys::Object::new();
    if let Some(state) = MATCHER_STATE.get() {
        let index = state.index;
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(true));
        let _ = js_sys::Reflect::set(&result, &"exactRules".into(), &JsValue::from(index.exact_rule_count() as u32));
        let _ = js_sys::Reflect::set(&result, &"patternRules".into(), &JsValue::from(index.pattern_rule_count() as u32));
        let _ = js_sys::Reflect::set(&result, &"patternNodes".into(), &JsValue::from(index.forest.len() as u32));
    } else {
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(false));
    }
    result.into()
}

/// Compile CSV rule text. `options_json` uses the same keys as the options file.
#[wasm_bindgen]
pub fn compile_redirects(csv_text: &str, options_json: Option<String>) -> Result<JsValue, JsValue> {
    let options = match options_json.as_deref() {
        Some(json) => RedirectOptions::from_json(json)
            .map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => RedirectOptions::default(),
    };

    let compilation = compile_csv(csv_text, &options)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let index_json = Snapshot::new(compilation.index)
        .to_json(false)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let rejected = js_sys::Array::new();
    for row in &compilation.rejected {
        let entry = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&entry, &"line".into(), &JsValue::from(row.line as u32));
        let _ = js_sys::Reflect::set(&entry, &"reason".into(), &JsValue::from_str(&row.error.to_string()));
        rejected.push(&entry);
    }

    if !compilation.rejected.is_empty() {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Skipped {} invalid redirect rows",
            compilation.rejected.len()
        )));
    }

    let stats = compilation.stats;
    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"index".into(), &JsValue::from_str(&index_json));
    let _ = js_sys::Reflect::set(&js_result, &"rulesAccepted".into(), &JsValue::from(stats.rows_accepted as u32));
    let _ = js_sys::Reflect::set(&js_result, &"rulesRejected".into(), &JsValue::from(stats.rows_rejected as u32));
    let _ = js_sys::Reflect::set(&js_result, &"exactRules".into(), &JsValue::from(stats.build.exact_rules as u32));
    let _ = js_sys::Reflect::set(&js_result, &"patternRules".into(), &JsValue::from(stats.build.pattern_rules as u32));
    let _ = js_sys::Reflect::set(&js_result, &"rejected".into(), &rejected);

    Ok(js_result.into())
}

/// Match a request URI such as `/old/page?a=1`.
#[wasm_bindgen]
pub fn match_redirect(uri: &str) -> JsValue {
    match_context(&RequestContext::from_uri(uri))
}

/// Match a request given its path and raw query string.
#[wasm_bindgen]
pub fn match_path(path: &str, query: &str) -> JsValue {
    match_context(&RequestContext::new(path, query))
}

fn match_context(ctx: &RequestContext<'_>) -> JsValue {
    let result = match MATCHER_STATE.get() {
        Some(state) => state.matcher.match_request(ctx),
        None => MatchResult::PassThrough,
    };
    result_to_js(&result)
}

fn result_to_js(result: &MatchResult<'_>) -> JsValue {
    let js_result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&js_result, &"redirect".into(), &JsValue::from(result.is_redirect()));

    match result {
        MatchResult::PassThrough => {}
        MatchResult::Excluded(reason) => {
            let _ = js_sys::Reflect::set(&js_result, &"excluded".into(), &JsValue::from(true));
            if let ExclusionReason::Pattern(pattern) = reason {
                let _ = js_sys::Reflect::set(&js_result, &"excludedBy".into(), &JsValue::from_str(pattern));
            }
        }
        MatchResult::Redirect(redirect) => {
            let kind = match redirect.kind {
                RuleKind::Exact => "exact",
                RuleKind::Pattern => "pattern",
            };
            let _ = js_sys::Reflect::set(&js_result, &"code".into(), &JsValue::from(redirect.code));
            let _ = js_sys::Reflect::set(&js_result, &"to".into(), &JsValue::from_str(redirect.to));
            let _ = js_sys::Reflect::set(&js_result, &"kind".into(), &JsValue::from_str(kind));
        }
    }

    js_result.into()
}
