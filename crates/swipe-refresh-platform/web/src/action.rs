use js_sys::{Function, Promise};
use swipe_refresh_core::{refresh_action, RefreshAction, RefreshError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Wraps a JS callback as a refresh action.
///
/// The callback runs as soon as the action is invoked. Its return value is
/// awaited through `Promise.resolve`, so plain values and thenables both work.
/// A throw or a rejection becomes a [`RefreshError`].
pub fn js_refresh_action(function: Function) -> RefreshAction {
    refresh_action(move || {
        let outcome = function.call0(&JsValue::UNDEFINED);
        async move {
            let value = outcome.map_err(js_error)?;
            JsFuture::from(Promise::resolve(&value))
                .await
                .map(drop)
                .map_err(js_error)
        }
    })
}

fn js_error(value: JsValue) -> RefreshError {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return RefreshError::new(String::from(error.message()));
    }
    match value.as_string() {
        Some(message) => RefreshError::new(message),
        None => RefreshError::new(format!("{value:?}")),
    }
}
